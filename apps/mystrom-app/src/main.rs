//! myStrom 连接器进程：调度器、输出事件监听与健康/指标 HTTP 接口。

mod handlers;
mod middleware;
mod routes;
mod scheduler;

use mystrom_assets::Reconciler;
use mystrom_broker::HttpBroker;
use mystrom_config::AppConfig;
use mystrom_control::{OutputDispatcher, spawn_output_listener};
use mystrom_pipeline::DataUpserter;
use mystrom_platform::{HttpPlatform, WebSocketSource};
use mystrom_storage::{
    AssetStore, ConfigurationStore, InMemoryAssetStore, InMemoryConfigurationStore, PgAssetStore,
    PgConfigurationStore, connect_pool,
};
use mystrom_telemetry::init_tracing;
use scheduler::{Scheduler, Services, WorkerRegistry};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub workers: WorkerRegistry,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在）
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    init_tracing();

    // 存储：配置了数据库则用 Postgres，否则退化为内存存储
    let (configs, assets): (Arc<dyn ConfigurationStore>, Arc<dyn AssetStore>) =
        match &config.database_url {
            Some(url) => {
                let pool = connect_pool(url).await?;
                (
                    Arc::new(PgConfigurationStore::new(pool.clone())),
                    Arc::new(PgAssetStore::new(pool)),
                )
            }
            None => {
                warn!(target: "mystrom.api", "database_url_missing_using_in_memory_stores");
                (
                    Arc::new(InMemoryConfigurationStore::new()),
                    Arc::new(InMemoryAssetStore::new()),
                )
            }
        };

    let broker = Arc::new(HttpBroker::new(&config.vendor_url)?);
    let platform = Arc::new(HttpPlatform::new(
        &config.platform_url,
        config.platform_token.clone(),
    )?);
    let upserter = DataUpserter::new(assets.clone(), platform.clone());

    let services = Arc::new(Services {
        configs: configs.clone(),
        broker: broker.clone(),
        reconciler: Reconciler::new(assets.clone(), platform.clone()),
        upserter: upserter.clone(),
        notifier: platform,
        notify_new_assets: config.notify_new_assets,
    });
    let workers = WorkerRegistry::default();
    Scheduler::new(services, workers.clone(), config.scan_interval()).spawn();

    let source = Arc::new(WebSocketSource::new(
        &config.platform_url,
        config.platform_token.clone(),
    )?);
    let dispatcher = OutputDispatcher::new(assets, configs, broker, upserter);
    spawn_output_listener(source, dispatcher, config.listener_retry());

    let app = routes::create_router(AppState { workers });
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(target: "mystrom.api", addr = %config.http_addr, "http_listening");
    axum::serve(listener, app).await?;
    Ok(())
}
