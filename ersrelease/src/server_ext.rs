//! Implémentation du trait ReleaseServerExt pour ersserver
//!
//! `ersrelease` enrichit `ersserver::Server` sans que `ersserver` connaisse
//! `ersrelease` : routes REST, fichiers statiques, middleware de
//! réconciliation et planificateur périodique.
//!
//! ```rust,no_run
//! use ersrelease::ReleaseServerExt;
//! use ersserver::ServerBuilder;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut server = ServerBuilder::new("EchoRiftSounds", "localhost", 3000).build();
//! let manager = server.init_release_service_configured().await?;
//!
//! server.start().await;
//! server.wait().await;
//! # Ok(())
//! # }
//! ```

use crate::config_ext::ReleaseConfigExt;
use crate::{ReleaseManager, ReleaseServerExt, ReleaseSettings};
use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
};
use ersserver::Server;
use tracing::{info, warn};
use utoipa::OpenApi;

/// Réconciliation opportuniste avant chaque requête
///
/// Un échec est journalisé et la requête continue normalement.
pub async fn reconcile_on_request(
    State(manager): State<ReleaseManager>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(e) = manager.reconcile_now().await {
        warn!("Reconciliation before {} failed: {}", request.uri().path(), e);
    }
    next.run(request).await
}

#[async_trait::async_trait]
impl ReleaseServerExt for Server {
    async fn init_release_service(&mut self, settings: ReleaseSettings) -> anyhow::Result<ReleaseManager> {
        let manager = ReleaseManager::new(settings)?;
        manager.init_documents().await?;

        let settings = manager.settings().clone();
        info!(
            media_dir = %settings.media_dir.display(),
            state_dir = %settings.state_dir.display(),
            "Initializing release service"
        );

        // Fichiers audio et documents d'état en lecture seule
        self.add_static_dir("/music", &settings.media_dir).await;
        self.add_static_file("/published.json", settings.published_path())
            .await;
        self.add_static_file("/scheduled.json", settings.scheduled_path())
            .await;

        // Routes finales : /api/releases/..., Swagger UI à /swagger-ui/releases
        let api_router = crate::api::release_api_router(manager.clone());
        self.add_openapi(api_router, crate::ApiDoc::openapi(), "releases")
            .await;

        let state = manager.clone();
        self.add_middleware(move |router| {
            router.layer(middleware::from_fn_with_state(
                state.clone(),
                reconcile_on_request,
            ))
        })
        .await;

        manager.spawn_scheduler();

        Ok(manager)
    }

    async fn init_release_service_configured(&mut self) -> anyhow::Result<ReleaseManager> {
        let config = ersconfig::get_config();
        let settings = config.release_settings()?;

        info!(
            "release settings: extensions {:?}, interval {}s",
            settings.filenames.extensions(),
            settings.reconcile_interval.as_secs()
        );

        self.init_release_service(settings).await
    }
}
