/// Entry point for the Quay Monitor metrics shipper.
///
/// Polls a Docker-compatible container runtime for per-container resource
/// counters and writes normalized metric events as NDJSON to stdout. An
/// interrupt (ctrl-c) cancels the poll loop and exits cleanly.
///
/// # Examples
///
/// ```bash
/// QUAY_MONITOR_PERIOD_SECS=5 cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let shutdown = tokio_util::sync::CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    log::info!("Received interrupt, shutting down");
                    shutdown.cancel();
                }
                Err(err) => log::error!("failed to listen for interrupt: {err}"),
            }
        });
    }

    quay_monitor::run(shutdown).await
}
