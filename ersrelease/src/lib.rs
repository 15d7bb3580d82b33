//! # ersrelease - Publication immédiate et planifiée de morceaux audio
//!
//! Cette crate gère deux collections persistées en JSON :
//! - **published.json** : noms des morceaux publiés (sans doublon)
//! - **scheduled.json** : file `{file, time}` des publications à venir
//!
//! # Architecture
//!
//! - **filename** : validation des noms de fichiers (pas de chemin, extension audio)
//! - **store** : lecture tolérante et écriture atomique des deux documents
//! - **reconcile** : migration des éléments échus vers la liste publiée
//! - **operations** : publier, planifier, dépublier, annuler
//! - **ReleaseManager** : sérialise toutes les opérations derrière un verrou,
//!   diffuse les évènements et lance la réconciliation périodique
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use ersrelease::{ReleaseManager, ReleaseSettings, ScheduleEntry};
//!
//! # #[tokio::main]
//! # async fn main() -> ersrelease::Result<()> {
//! let manager = ReleaseManager::new(ReleaseSettings::new("./music", "./state"))?;
//!
//! manager.publish_now(&["Song Title.mp3".to_string()]).await?;
//! manager
//!     .schedule(&[ScheduleEntry::new("Next Single.flac", "2030-01-01T00:00:00Z")])
//!     .await?;
//!
//! // Publie ce qui est échu
//! let released = manager.reconcile_now().await?;
//! println!("Released: {:?}", released);
//! # Ok(())
//! # }
//! ```

mod error;
pub mod filename;
pub mod library;
mod manager;
pub mod operations;
pub mod reconcile;
mod schedule;
mod settings;
pub mod store;

#[cfg(feature = "ersconfig")]
mod config_ext;

#[cfg(feature = "ersserver")]
pub mod api;
#[cfg(feature = "ersserver")]
mod openapi;
#[cfg(feature = "ersserver")]
pub mod server_ext;
#[cfg(feature = "ersserver")]
pub mod sse;

// Réexports publics
pub use error::{Error, Result};
pub use filename::{is_valid_filename, FilenamePolicy};
pub use manager::{ReleaseEvent, ReleaseEventEnvelope, ReleaseManager};
pub use operations::{PublishOutcome, PublishRequest, ReleaseRules};
pub use schedule::{
    format_release_time, parse_release_time, ReleaseState, ScheduleEntry, ScheduledItem,
};
pub use settings::{ReleaseSettings, DEFAULT_RECONCILE_INTERVAL};
pub use store::{StateStore, StoredEntry};

#[cfg(feature = "ersconfig")]
pub use config_ext::ReleaseConfigExt;

#[cfg(feature = "ersserver")]
pub use openapi::ApiDoc;

/// Trait d'extension pour ajouter le service de publication à ersserver
#[cfg(feature = "ersserver")]
#[async_trait::async_trait]
pub trait ReleaseServerExt {
    /// Initialise le service et enregistre les routes HTTP
    ///
    /// # Routes enregistrées
    ///
    /// - `GET /music/{file}` - Fichiers audio du répertoire média
    /// - `GET /published.json`, `GET /scheduled.json` - Documents d'état
    /// - `GET /api/releases/files` - Fichiers audio disponibles
    /// - `GET /api/releases/published|scheduled|state` - État courant
    /// - `POST /api/releases/publish` - Publication immédiate et/ou planifiée
    /// - `POST /api/releases/unpublish` - Retrait de la liste publiée
    /// - `POST /api/releases/scheduled/cancel` - Annulation de planifications
    /// - `POST /api/releases/reconcile` - Réconciliation manuelle
    /// - `GET /api/releases/events` - Flux SSE
    /// - `GET /swagger-ui/releases` - Documentation interactive
    ///
    /// Un middleware réconcilie avant chaque requête et une tâche de fond
    /// réconcilie périodiquement.
    async fn init_release_service(
        &mut self,
        settings: ReleaseSettings,
    ) -> anyhow::Result<ReleaseManager>;

    /// Initialise le service avec les paramètres de `ersconfig::Config`
    async fn init_release_service_configured(&mut self) -> anyhow::Result<ReleaseManager>;
}
