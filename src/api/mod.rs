pub mod routes;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info};

use crate::config::ApiConfig;
use crate::testbed::Testbed;

pub use routes::router;

/// 在独立线程中启动 HTTP 服务，自带 tokio 运行时
pub fn spawn_api_server(
    config: ApiConfig,
    testbed: Testbed,
    shutdown_signal: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new().name("api".into()).spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("api-worker")
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("Failed to create API runtime: {}", e);
                return;
            }
        };
        if let Err(e) = runtime.block_on(serve(config, testbed, shutdown_signal)) {
            error!("API server error: {}", e);
        }
        info!("API server thread exiting");
    })
}

pub async fn serve(
    config: ApiConfig,
    testbed: Testbed,
    shutdown_signal: Arc<AtomicBool>,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("HTTP API listening on {}", config.bind_addr);

    axum::serve(listener, router(testbed))
        .with_graceful_shutdown(wait_for_shutdown(shutdown_signal))
        .await
}

async fn wait_for_shutdown(shutdown_signal: Arc<AtomicBool>) {
    while !shutdown_signal.load(Ordering::Relaxed) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    info!("HTTP API shutting down");
}
