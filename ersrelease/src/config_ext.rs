//! Extension de ersconfig pour le service de publication
//!
//! Clés lues sous `release` :
//!
//! ```yaml
//! release:
//!   media_dir: "music"
//!   state_dir: "state"
//!   extensions: [mp3, wav, flac]
//!   max_filename_len: 255
//!   reconcile_interval_secs: 30
//!   require_existing_media: false
//! ```

use crate::filename::{FilenamePolicy, DEFAULT_EXTENSIONS, MAX_FILENAME_LEN};
use crate::settings::{ReleaseSettings, DEFAULT_RECONCILE_INTERVAL};
use anyhow::Result;
use ersconfig::Config;
use serde_yaml::{Number, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

const DEFAULT_MEDIA_DIR: &str = "music";
const DEFAULT_STATE_DIR: &str = "state";

/// Trait d'extension pour ersconfig::Config
pub trait ReleaseConfigExt {
    /// Répertoire des fichiers audio (créé si absent)
    fn get_media_dir(&self) -> Result<PathBuf>;

    fn set_media_dir(&self, directory: String) -> Result<()>;

    /// Répertoire des documents d'état (créé si absent)
    fn get_state_dir(&self) -> Result<PathBuf>;

    fn set_state_dir(&self, directory: String) -> Result<()>;

    /// Extensions audio autorisées (default: mp3, wav, flac)
    fn get_release_extensions(&self) -> Result<Vec<String>>;

    /// Longueur maximale d'un nom de fichier (default: 255)
    fn get_max_filename_len(&self) -> Result<usize>;

    /// Période du planificateur (default: 30 s)
    fn get_reconcile_interval(&self) -> Result<Duration>;

    fn set_reconcile_interval(&self, interval: Duration) -> Result<()>;

    /// Vérifie la présence des fichiers avant publication (default: false)
    fn get_require_existing_media(&self) -> Result<bool>;

    /// Paramètres complets du service
    fn release_settings(&self) -> Result<ReleaseSettings>;
}

impl ReleaseConfigExt for Config {
    fn get_media_dir(&self) -> Result<PathBuf> {
        self.get_managed_dir(&["release", "media_dir"], DEFAULT_MEDIA_DIR)
    }

    fn set_media_dir(&self, directory: String) -> Result<()> {
        self.set_managed_dir(&["release", "media_dir"], directory)
    }

    fn get_state_dir(&self) -> Result<PathBuf> {
        self.get_managed_dir(&["release", "state_dir"], DEFAULT_STATE_DIR)
    }

    fn set_state_dir(&self, directory: String) -> Result<()> {
        self.set_managed_dir(&["release", "state_dir"], directory)
    }

    fn get_release_extensions(&self) -> Result<Vec<String>> {
        let defaults = || DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect();

        match self.get_value(&["release", "extensions"]) {
            Ok(Value::Sequence(seq)) => {
                let exts: Vec<String> = seq
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect();
                if exts.is_empty() {
                    warn!("No usable release.extensions, using defaults");
                    Ok(defaults())
                } else {
                    Ok(exts)
                }
            }
            // Forme courte : "mp3,flac"
            Ok(Value::String(s)) => Ok(s.split(',').map(|e| e.trim().to_string()).collect()),
            _ => Ok(defaults()),
        }
    }

    fn get_max_filename_len(&self) -> Result<usize> {
        match self.get_value(&["release", "max_filename_len"]) {
            Ok(Value::Number(n)) => Ok(n
                .as_u64()
                .filter(|v| *v > 0)
                .map(|v| v as usize)
                .unwrap_or(MAX_FILENAME_LEN)),
            _ => Ok(MAX_FILENAME_LEN),
        }
    }

    fn get_reconcile_interval(&self) -> Result<Duration> {
        match self.get_value(&["release", "reconcile_interval_secs"]) {
            Ok(Value::Number(n)) => match n.as_u64() {
                Some(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
                _ => {
                    warn!("Invalid release.reconcile_interval_secs, using default");
                    Ok(DEFAULT_RECONCILE_INTERVAL)
                }
            },
            _ => Ok(DEFAULT_RECONCILE_INTERVAL),
        }
    }

    fn set_reconcile_interval(&self, interval: Duration) -> Result<()> {
        self.set_value(
            &["release", "reconcile_interval_secs"],
            Value::Number(Number::from(interval.as_secs())),
        )
    }

    fn get_require_existing_media(&self) -> Result<bool> {
        match self.get_value(&["release", "require_existing_media"]) {
            Ok(Value::Bool(b)) => Ok(b),
            _ => Ok(false),
        }
    }

    fn release_settings(&self) -> Result<ReleaseSettings> {
        let mut settings = ReleaseSettings::new(self.get_media_dir()?, self.get_state_dir()?);
        settings.filenames =
            FilenamePolicy::new(self.get_release_extensions()?, self.get_max_filename_len()?);
        settings.reconcile_interval = self.get_reconcile_interval()?;
        settings.require_existing_media = self.get_require_existing_media()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        (dir, config)
    }

    #[test]
    fn test_default_settings() {
        let (dir, config) = config();
        let settings = config.release_settings().unwrap();

        assert!(settings.media_dir.ends_with("music"));
        assert!(settings.state_dir.ends_with("state"));
        assert!(settings.media_dir.starts_with(dir.path()));
        assert!(settings.state_dir.is_dir());
        assert_eq!(settings.filenames, FilenamePolicy::default());
        assert_eq!(settings.reconcile_interval, Duration::from_secs(30));
        assert!(!settings.require_existing_media);
    }

    #[test]
    fn test_overrides() {
        let (_dir, config) = config();
        config
            .set_value(
                &["release", "extensions"],
                Value::Sequence(vec![Value::String("ogg".into())]),
            )
            .unwrap();
        config
            .set_value(&["release", "require_existing_media"], Value::Bool(true))
            .unwrap();
        config.set_reconcile_interval(Duration::from_secs(5)).unwrap();

        let settings = config.release_settings().unwrap();
        assert!(settings.filenames.is_valid("a.ogg"));
        assert!(!settings.filenames.is_valid("a.mp3"));
        assert!(settings.require_existing_media);
        assert_eq!(settings.reconcile_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_interval_falls_back() {
        let (_dir, config) = config();
        config.set_reconcile_interval(Duration::ZERO).unwrap();
        assert_eq!(config.get_reconcile_interval().unwrap(), DEFAULT_RECONCILE_INTERVAL);
    }
}
