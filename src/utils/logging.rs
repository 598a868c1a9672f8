/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`；未设置时默认 info，详细模式下为 debug。
/// 重复初始化（比如测试中）会被忽略。
pub fn init(verbose: bool) {
    let default_level = if verbose {
        "stem_collect=debug,tower_http=debug,info"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 题目录入服务");
    info!("🌐 监听地址: {}", config.bind_addr);
    info!("🗄️ 数据库: {}", config.database_url);
    info!("🤖 审核模型: {}", config.llm_model_name);
    if config.llm_api_key.trim().is_empty() {
        info!("⚠️ 未配置 LLM_API_KEY，AI 审核将不可用");
    }
    info!("⏱️ 自动保存静默期: {} ms", config.autosave_debounce_ms);
    info!("⏱️ 自动保存任务空闲退出: {} s", config.autosave_idle_secs);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
