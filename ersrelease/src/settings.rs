//! Paramètres injectables du service de publication

use crate::filename::FilenamePolicy;
use crate::store::{StateStore, PUBLISHED_FILE, SCHEDULED_FILE};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Période par défaut du planificateur
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(30);

/// Paramètres du service
///
/// Construits depuis la configuration par
/// [`ReleaseConfigExt::release_settings`](crate::ReleaseConfigExt::release_settings)
/// ou directement (tests, intégration).
#[derive(Debug, Clone)]
pub struct ReleaseSettings {
    /// Répertoire des fichiers audio
    pub media_dir: PathBuf,
    /// Répertoire de `published.json` et `scheduled.json`
    pub state_dir: PathBuf,
    pub filenames: FilenamePolicy,
    pub reconcile_interval: Duration,
    /// Refuse de publier ou planifier un fichier absent du répertoire média
    pub require_existing_media: bool,
}

impl ReleaseSettings {
    pub fn new(media_dir: impl Into<PathBuf>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            media_dir: media_dir.into(),
            state_dir: state_dir.into(),
            filenames: FilenamePolicy::default(),
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            require_existing_media: false,
        }
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    pub fn published_path(&self) -> PathBuf {
        self.state_dir.join(PUBLISHED_FILE)
    }

    pub fn scheduled_path(&self) -> PathBuf {
        self.state_dir.join(SCHEDULED_FILE)
    }

    pub fn store(&self) -> StateStore {
        StateStore::in_dir(&self.state_dir)
    }
}
