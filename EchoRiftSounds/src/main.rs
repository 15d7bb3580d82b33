use ersconfig::get_config;
use ersrelease::ReleaseServerExt;
use ersserver::{LoggingOptions, ServerBuilder};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========== PHASE 1 : Infrastructure HTTP ==========
    let config = get_config();

    let mut server = ServerBuilder::new_configured().build();
    server
        .init_logging(LoggingOptions::from_config(&config))
        .await;

    server
        .add_route("/info", || async {
            serde_json::json!({"name": "EchoRiftSounds", "version": env!("CARGO_PKG_VERSION")})
        })
        .await;

    // ========== PHASE 2 : Service de publication ==========
    info!("🎵 Initializing release service...");
    let manager = server.init_release_service_configured().await?;

    let state = manager.state().await?;
    info!(
        "✅ {} published track(s), {} scheduled",
        state.published.len(),
        state.scheduled.len()
    );

    server.add_redirect("/", "/swagger-ui/releases").await;

    // ========== PHASE 3 : Démarrage du serveur ==========
    info!("🌐 Starting HTTP server...");
    server.start().await;

    info!("✅ EchoRiftSounds is ready!");
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    Ok(())
}
