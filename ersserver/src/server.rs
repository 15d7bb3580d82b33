//! # Module Server - API de haut niveau pour Axum
//!
//! Ce module cache la configuration et le routage Axum derrière un
//! [`Server`] que les autres crates enrichissent via des traits d'extension.
//!
//! - **Routes JSON simples** : [`Server::add_route`]
//! - **Handlers avec état** : [`Server::add_handler_with_state`]
//! - **Fichiers statiques** : [`Server::add_static_dir`], [`Server::add_static_file`]
//! - **Middlewares globaux** : [`Server::add_middleware`]
//! - **Documentation API** : [`Server::add_openapi`]

use crate::logs::{LogState, LoggingOptions, create_logs_router, init_logging, log_dump, log_sse};
use axum::handler::Handler;
use axum::response::Redirect;
use axum::routing::get;
use axum::{Json, Router};
use ersconfig::get_config;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::{signal, sync::RwLock, task::JoinHandle};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

type Middleware = Box<dyn Fn(Router) -> Router + Send + Sync>;

/// Info serveur sérialisable
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct ServerInfo {
    pub name: String,
    pub base_url: String,
    pub http_port: u16,
}

/// Serveur principal
pub struct Server {
    name: String,
    base_url: String,
    http_port: u16,
    router: Arc<RwLock<Router>>,
    middlewares: Arc<RwLock<Vec<Middleware>>>,
    join_handle: Option<JoinHandle<()>>,
    log_state: Option<LogState>,
}

impl Server {
    /// Crée une nouvelle instance de serveur
    ///
    /// # Arguments
    ///
    /// * `name` - Nom du serveur (pour les logs)
    /// * `base_url` - Hôte annoncé (ex: "localhost")
    /// * `http_port` - Port HTTP à écouter
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http_port,
            router: Arc::new(RwLock::new(Router::new())),
            middlewares: Arc::new(RwLock::new(Vec::new())),
            join_handle: None,
            log_state: None,
        }
    }

    pub fn new_configured() -> Self {
        ServerBuilder::new_configured().build()
    }

    async fn merge_at(&mut self, path: &str, route: Router) {
        let mut r = self.router.write().await;
        *r = if path == "/" {
            std::mem::take(&mut *r).merge(route)
        } else {
            std::mem::take(&mut *r).nest(path, route)
        };
    }

    /// Ajoute une route JSON dynamique
    ///
    /// La closure fournie est appelée à chaque requête GET sur `path`.
    ///
    /// ```rust,no_run
    /// # use ersserver::Server;
    /// # #[tokio::main]
    /// # async fn main() {
    /// # let mut server = Server::new("Test", "localhost", 3000);
    /// server.add_route("/api/status", || async {
    ///     serde_json::json!({ "status": "online" })
    /// }).await;
    /// # }
    /// ```
    pub async fn add_route<F, Fut, T>(&mut self, path: &str, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let f = Arc::new(f);
        let handler = move || {
            let f = f.clone();
            async move { Json(f().await) }
        };

        self.merge_at(path, Router::new().route("/", get(handler)))
            .await;
    }

    /// Ajoute un handler GET avec état
    pub async fn add_handler_with_state<H, T, S>(&mut self, path: &str, handler: H, state: S)
    where
        H: Handler<T, S> + Clone + 'static,
        T: 'static,
        S: Clone + Send + Sync + 'static,
    {
        let route = Router::new().route("/", get(handler)).with_state(state);
        self.merge_at(path, route).await;
    }

    /// Sert un répertoire du disque sous `path`
    ///
    /// Les fichiers absents renvoient 404.
    pub async fn add_static_dir(&mut self, path: &str, dir: impl AsRef<Path>) {
        let route = Router::new().nest_service(path, ServeDir::new(dir.as_ref()));
        self.merge_at("/", route).await;
    }

    /// Sert un fichier unique du disque sous `path`
    pub async fn add_static_file(&mut self, path: &str, file: impl AsRef<Path>) {
        let route = Router::new().route_service(path, ServeFile::new(file.as_ref()));
        self.merge_at("/", route).await;
    }

    /// Ajoute une redirection HTTP permanente (308)
    pub async fn add_redirect(&mut self, from: &str, to: &str) {
        let target = to.to_string();
        let route = Router::new().route(
            "/",
            get(move || {
                let target = target.clone();
                async move { Redirect::permanent(&target) }
            }),
        );
        self.merge_at(from, route).await;
    }

    /// Ajoute un sous-router au serveur
    ///
    /// - Si `path` est "/", merge directement au router principal
    /// - Sinon, nest le router sous le chemin donné
    pub async fn add_router(&mut self, path: &str, sub_router: Router) {
        if path == "/" {
            self.merge_at("/", sub_router).await;
        } else {
            let normalized = format!("/{}", path.trim_start_matches('/'));
            self.merge_at(&normalized, sub_router).await;
        }
    }

    /// Enregistre un middleware appliqué à l'ensemble du router
    ///
    /// Les middlewares sont appliqués au démarrage, dans l'ordre
    /// d'enregistrement, et couvrent donc aussi les routes ajoutées après eux.
    pub async fn add_middleware<F>(&mut self, f: F)
    where
        F: Fn(Router) -> Router + Send + Sync + 'static,
    {
        self.middlewares.write().await.push(Box::new(f));
    }

    /// Ajoute une API documentée avec OpenAPI et Swagger UI
    ///
    /// - `/api/{name}/...` : routes de `api_router`
    /// - `/swagger-ui/{name}` : documentation interactive
    /// - `/api-docs/{name}.json` : spécification OpenAPI
    pub async fn add_openapi(
        &mut self,
        api_router: Router,
        openapi: utoipa::openapi::OpenApi,
        name: &str,
    ) {
        let swagger_path = format!("/swagger-ui/{}", name);
        let openapi_json_path = format!("/api-docs/{}.json", name);
        let openapi_json_path: &'static str = Box::leak(openapi_json_path.into_boxed_str());

        let swagger = SwaggerUi::new(swagger_path).url(openapi_json_path, openapi);

        let nested_router = Router::new().nest(&format!("/api/{}", name), api_router);

        let mut r = self.router.write().await;
        *r = std::mem::take(&mut *r).merge(nested_router).merge(swagger);
    }

    /// Construit le router final (routes + middlewares)
    pub async fn router(&self) -> Router {
        let mut router = self.router.read().await.clone();
        for middleware in self.middlewares.read().await.iter() {
            router = middleware(router);
        }
        router
    }

    /// Démarre le serveur HTTP
    ///
    /// Lance le serveur sur le port configuré ; Ctrl+C déclenche un arrêt gracieux.
    pub async fn start(&mut self) {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.http_port));
        info!(
            "Server {} running at http://{}:{}",
            self.name, self.base_url, self.http_port
        );

        let router = self.router().await;
        self.join_handle = Some(tokio::spawn(async move {
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(e) => {
                    error!("Cannot bind {}: {}", addr, e);
                    return;
                }
            };

            let shutdown = async {
                if let Err(e) = signal::ctrl_c().await {
                    error!("Failed to listen for Ctrl+C: {}", e);
                    std::future::pending::<()>().await;
                }
                info!("Ctrl+C reçu, arrêt gracieux");
            };

            if let Err(e) = axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("HTTP server error: {}", e);
            }
        }));
    }

    /// Attend la fin du serveur
    pub async fn wait(&mut self) {
        if let Some(h) = self.join_handle.take() {
            let _ = h.await;
        }
    }

    /// Récupère les infos du serveur
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            http_port: self.http_port,
        }
    }

    /// État des logs, si [`Server::init_logging`] a été appelé
    pub fn log_state(&self) -> Option<LogState> {
        self.log_state.clone()
    }

    /// Initialise le système de logging et enregistre les routes de logs
    ///
    /// Routes enregistrées : `/log-sse`, `/log-dump` et `/api/logs/log_setup`.
    pub async fn init_logging(&mut self, options: LoggingOptions) {
        let log_state = init_logging(options);

        self.add_handler_with_state("/log-sse", log_sse, log_state.clone())
            .await;
        self.add_handler_with_state("/log-dump", log_dump, log_state.clone())
            .await;
        self.add_openapi(
            create_logs_router(log_state.clone()),
            crate::logs::LogsApiDoc::openapi(),
            "logs",
        )
        .await;

        self.log_state = Some(log_state);
    }
}

/// Builder pattern
pub struct ServerBuilder {
    name: String,
    base_url: String,
    http_port: u16,
}

impl ServerBuilder {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http_port,
        }
    }

    pub fn new_configured() -> Self {
        let config = get_config();
        Self {
            name: "EchoRiftSounds".to_string(),
            base_url: config.get_base_url(),
            http_port: config.get_http_port(),
        }
    }

    /// Construit le serveur
    pub fn build(self) -> Server {
        Server::new(self.name, self.base_url, self.http_port)
    }
}
