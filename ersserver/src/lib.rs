//! # ersserver - Serveur web haut niveau basé sur Axum
//!
//! Cette crate fournit une abstraction simple pour monter le serveur HTTP
//! d'EchoRiftSounds avec Axum.
//!
//! ## Fonctionnalités
//!
//! - **API de haut niveau** : routes JSON, handlers avec état, sous-routers
//! - **Fichiers statiques** : répertoires et fichiers servis depuis le disque
//! - **Middlewares** : couches appliquées à toutes les routes au démarrage
//! - **Server-Sent Events (SSE)** : logs en temps réel via `/log-sse`
//! - **Documentation OpenAPI** : Swagger UI par API enregistrée
//! - **Arrêt gracieux** : gestion de Ctrl+C
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use ersserver::{ServerBuilder, logs::LoggingOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut server = ServerBuilder::new("MyServer", "localhost", 8080).build();
//!     server.init_logging(LoggingOptions::default()).await;
//!
//!     server.add_route("/api/status", || async {
//!         serde_json::json!({"status": "ok"})
//!     }).await;
//!
//!     server.start().await;
//!     server.wait().await;
//! }
//! ```

pub mod logs;
pub mod server;

pub use logs::{LogState, LoggingOptions, SseLayer, log_dump, log_sse};
pub use server::{Server, ServerBuilder, ServerInfo};
