//! Types d'erreurs pour ersrelease

use std::path::PathBuf;

/// Erreurs de publication et de planification
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid filenames: {}", .0.join(", "))]
    InvalidFilenames(Vec<String>),

    #[error("Invalid scheduled items: {}", .0.join(", "))]
    InvalidScheduledItems(Vec<String>),

    #[error("No files to publish or schedule")]
    EmptyRequest,

    #[error("Files not found in media directory: {}", .0.join(", "))]
    MissingMedia(Vec<String>),

    #[error("Storage error on {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Vrai pour les erreurs dues à l'entrée de l'opérateur
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFilenames(_)
                | Self::InvalidScheduledItems(_)
                | Self::EmptyRequest
                | Self::MissingMedia(_)
        )
    }
}

/// Type Result spécialisé pour ersrelease
pub type Result<T> = std::result::Result<T, Error>;
