use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use crate::api::{build_router, AppState};
use crate::config::Config;
use crate::db;
use crate::services::{ImageStore, LlmService, LocalImageStore, ReviewModel};
use crate::utils::logging::log_startup;

/// 应用主结构
pub struct App {
    config: Config,
    state: AppState,
}

impl App {
    /// 初始化应用：连接数据库、建表、组装服务
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let pool = db::connect(&config.database_url)
            .await
            .with_context(|| format!("无法连接数据库: {}", config.database_url))?;

        let model: Arc<dyn ReviewModel> = Arc::new(LlmService::new(&config));
        let images: Arc<dyn ImageStore> = Arc::new(LocalImageStore::from_config(&config));
        let state = AppState::new(config.clone(), pool, model, images);

        Ok(Self { config, state })
    }

    /// 运行 HTTP 服务直到进程退出
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.bind_addr)
            .await
            .with_context(|| format!("无法监听地址: {}", self.config.bind_addr))?;
        info!("✓ 服务已启动: http://{}", listener.local_addr()?);

        axum::serve(listener, build_router(self.state))
            .await
            .context("HTTP 服务异常退出")?;

        Ok(())
    }
}
