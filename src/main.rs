use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use vith::config::{AppConfig, Args};
use vith::http::{router, HttpState};
use vith::worker::StreamWorker;
use vith::{amqp, logging, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(&args).context("load configuration")?;
    logging::init_logging(&config.logging).context("initialize logging")?;

    info!(host = %config.server.host, port = config.server.port, "vith starting");

    let state = AppState::new(config).context("initialize application state")?;
    let shutdown = CancellationToken::new();

    let worker = StreamWorker::spawn(state.clone(), shutdown.child_token());

    let http_state = HttpState {
        app: state.clone(),
        worker: worker.clone(),
        shutdown: shutdown.clone(),
    };
    let addr = format!("{}:{}", http_state.app.config.server.host, http_state.app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.context("bind http listener")?;
    info!(addr = %addr, "http server listening");
    let app = router(http_state);
    let http_shutdown = shutdown.clone();
    let http_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { http_shutdown.cancelled().await })
            .await
    });

    let amqp_state = state.clone();
    let amqp_worker = worker.clone();
    let amqp_shutdown = shutdown.child_token();
    let amqp_task = tokio::spawn(async move {
        if let Err(e) = amqp::run(amqp_state, amqp_worker, amqp_shutdown).await {
            error!("amqp consumer exited with error: {e}");
        }
    });

    tokio::select! {
        result = http_task => {
            match result {
                Ok(Err(e)) => error!("http server error: {e}"),
                Err(e) => error!("http server task panicked: {e}"),
                Ok(Ok(())) => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
    }

    shutdown.cancel();
    worker.wait_done().await;
    let _ = amqp_task.await;

    info!("vith shut down cleanly");
    Ok(())
}
