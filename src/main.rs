use std::path::PathBuf;

use anyhow::Result;
use stem_collect::utils::logging;
use stem_collect::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置：CONFIG_FILE 指向的 TOML 文件（可选）+ 环境变量
    let config_file = std::env::var("CONFIG_FILE").ok().map(PathBuf::from);
    let config = Config::load(config_file.as_deref())?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
