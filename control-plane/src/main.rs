use slug_control_plane::{bootstrap_kernel, init_tracing, serve, DEFAULT_SHUTDOWN_TIMEOUT};
use slug_kernel::KernelConfig;

#[tokio::main]
async fn main() {
    init_tracing();

    let kernel = bootstrap_kernel(KernelConfig::default());
    let shutdown_kernel = kernel.clone();

    let addr = std::env::var("SLUG_CONTROL_PLANE_ADDR").unwrap_or_else(|_| "127.0.0.1:7878".into());

    tokio::select! {
        result = serve(kernel, &addr) => {
            if let Err(err) = result {
                tracing::error!(%err, "control plane server exited with an error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    tokio::time::timeout(DEFAULT_SHUTDOWN_TIMEOUT, shutdown_kernel.request_shutdown())
        .await
        .ok();
}
