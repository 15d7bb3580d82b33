//! Persistance JSON des morceaux publiés et planifiés
//!
//! Deux documents indépendants, chacun un tableau JSON indenté :
//!
//! - `published.json` : `["a.mp3", "b.flac"]`
//! - `scheduled.json` : `[{"file": "c.wav", "time": "2024-06-01T00:00:00.000Z"}]`
//!
//! Un document absent, vide ou illisible est lu comme une collection vide.
//! Une entrée illisible d'un document valide est conservée telle quelle
//! ([`StoredEntry::Unparsed`]) et réécrite sans modification.
//! Les écritures passent par un fichier temporaire renommé sur la cible.

use crate::schedule::ScheduledItem;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const PUBLISHED_FILE: &str = "published.json";
pub const SCHEDULED_FILE: &str = "scheduled.json";

/// Entrée d'un document d'état
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StoredEntry<T> {
    Parsed(T),
    /// Valeur non interprétable, recopiée à l'identique
    Unparsed(Value),
}

impl<T> StoredEntry<T> {
    pub fn parsed(&self) -> Option<&T> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Unparsed(_) => None,
        }
    }

    pub fn into_parsed(self) -> Option<T> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Unparsed(_) => None,
        }
    }
}

/// Accès aux deux documents d'état
#[derive(Debug, Clone)]
pub struct StateStore {
    published_path: PathBuf,
    scheduled_path: PathBuf,
}

impl StateStore {
    pub fn new(published_path: impl Into<PathBuf>, scheduled_path: impl Into<PathBuf>) -> Self {
        Self {
            published_path: published_path.into(),
            scheduled_path: scheduled_path.into(),
        }
    }

    /// Store utilisant les noms de fichiers standards dans `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(PUBLISHED_FILE), dir.join(SCHEDULED_FILE))
    }

    pub fn published_path(&self) -> &Path {
        &self.published_path
    }

    pub fn scheduled_path(&self) -> &Path {
        &self.scheduled_path
    }

    /// Noms publiés lisibles
    pub fn load_published(&self) -> Vec<String> {
        parsed_only(self.load_published_entries())
    }

    /// Document publié complet, entrées illisibles comprises
    pub fn load_published_entries(&self) -> Vec<StoredEntry<String>> {
        load_entries(&self.published_path)
    }

    pub fn save_published(&self, published: &[String]) -> Result<()> {
        write_document(&self.published_path, &published)
    }

    pub fn save_published_entries(&self, entries: &[StoredEntry<String>]) -> Result<()> {
        write_document(&self.published_path, &entries)
    }

    /// Éléments planifiés lisibles
    pub fn load_scheduled(&self) -> Vec<ScheduledItem> {
        parsed_only(self.load_scheduled_entries())
    }

    /// File complète, entrées illisibles comprises
    pub fn load_scheduled_entries(&self) -> Vec<StoredEntry<ScheduledItem>> {
        load_entries(&self.scheduled_path)
    }

    pub fn save_scheduled(&self, scheduled: &[ScheduledItem]) -> Result<()> {
        write_document(&self.scheduled_path, &scheduled)
    }

    pub fn save_scheduled_entries(&self, entries: &[StoredEntry<ScheduledItem>]) -> Result<()> {
        write_document(&self.scheduled_path, &entries)
    }
}

fn parsed_only<T>(entries: Vec<StoredEntry<T>>) -> Vec<T> {
    entries.into_iter().filter_map(StoredEntry::into_parsed).collect()
}

fn load_entries<T: DeserializeOwned>(path: &Path) -> Vec<StoredEntry<T>> {
    let Some(values) = read_array(path) else {
        return Vec::new();
    };

    values
        .into_iter()
        .map(|value| match serde_json::from_value::<T>(value.clone()) {
            Ok(parsed) => StoredEntry::Parsed(parsed),
            Err(e) => {
                warn!(path = %path.display(), entry = %value, error = %e, "Keeping unreadable state entry as is");
                StoredEntry::Unparsed(value)
            }
        })
        .collect()
}

/// Lit un tableau JSON ; `None` si le document est absent, vide ou invalide
fn read_array(path: &Path) -> Option<Vec<Value>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "State document not found, starting empty");
            return None;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read state document");
            return None;
        }
    };

    if content.trim().is_empty() {
        return None;
    }

    match serde_json::from_str::<Vec<Value>>(&content) {
        Ok(entries) => Some(entries),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot parse state document");
            None
        }
    }
}

/// Écrit `value` en JSON indenté via fichier temporaire + renommage
fn write_document<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| Error::storage(parent, e))?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| Error::storage(parent, e))?;
    temp.write_all(json.as_bytes())
        .map_err(|e| Error::storage(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| Error::storage(temp.path(), e))?;

    // Les documents sont aussi servis en lecture seule
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o644)) {
            warn!(path = %temp.path().display(), error = %e, "Cannot set state document permissions");
        }
    }

    temp.persist(path).map_err(|e| Error::storage(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn store() -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::in_dir(dir.path());
        (dir, store)
    }

    #[test]
    fn test_missing_documents_are_empty() {
        let (_dir, store) = store();
        assert!(store.load_published().is_empty());
        assert!(store.load_scheduled().is_empty());
    }

    #[test]
    fn test_empty_and_corrupt_documents_are_empty() {
        let (_dir, store) = store();
        fs::write(store.published_path(), "   \n").unwrap();
        fs::write(store.scheduled_path(), "{not json").unwrap();

        assert!(store.load_published().is_empty());
        assert!(store.load_scheduled().is_empty());
    }

    #[test]
    fn test_save_is_pretty_printed() {
        let (_dir, store) = store();
        store
            .save_published(&["a.mp3".to_string(), "b.mp3".to_string()])
            .unwrap();

        let content = fs::read_to_string(store.published_path()).unwrap();
        assert_eq!(content, "[\n  \"a.mp3\",\n  \"b.mp3\"\n]");
        assert_eq!(store.load_published(), vec!["a.mp3", "b.mp3"]);
    }

    #[test]
    fn test_save_replaces_previous_content() {
        let (_dir, store) = store();
        store.save_published(&["a.mp3".to_string()]).unwrap();
        store.save_published(&[]).unwrap();

        assert_eq!(fs::read_to_string(store.published_path()).unwrap(), "[]");
    }

    #[test]
    fn test_save_leaves_no_temporary_files() {
        let (dir, store) = store();
        store.save_published(&["a.mp3".to_string()]).unwrap();
        store.save_scheduled(&[]).unwrap();

        let mut names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec![PUBLISHED_FILE, SCHEDULED_FILE]);
    }

    #[test]
    fn test_scheduled_round_trip_and_malformed_entries() {
        let (_dir, store) = store();
        fs::write(
            store.scheduled_path(),
            r#"[
  {"file": "a.mp3", "time": "2024-01-01T00:00:00Z"},
  {"file": "b.mp3", "time": "not a date"},
  {"file": "c.mp3"}
]"#,
        )
        .unwrap();

        let items = store.load_scheduled();
        assert_eq!(
            items,
            vec![ScheduledItem::new(
                "a.mp3",
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            )]
        );
    }

    #[test]
    fn test_non_string_published_entries_are_not_listed() {
        let (_dir, store) = store();
        fs::write(store.published_path(), r#"["a.mp3", 42, null]"#).unwrap();
        assert_eq!(store.load_published(), vec!["a.mp3"]);
    }

    #[test]
    fn test_unreadable_entries_survive_a_rewrite() {
        let (_dir, store) = store();
        fs::write(
            store.scheduled_path(),
            r#"[{"file": "keep.mp3", "time": "next spring"}, {"file": "a.mp3", "time": "2024-01-01T00:00:00Z"}]"#,
        )
        .unwrap();

        let entries = store.load_scheduled_entries();
        assert_eq!(
            entries[0],
            StoredEntry::Unparsed(serde_json::json!({"file": "keep.mp3", "time": "next spring"}))
        );
        store.save_scheduled_entries(&entries).unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(store.scheduled_path()).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!([
                {"file": "keep.mp3", "time": "next spring"},
                {"file": "a.mp3", "time": "2024-01-01T00:00:00.000Z"}
            ])
        );
    }

    #[test]
    fn test_state_dir_is_created_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::in_dir(dir.path().join("nested").join("state"));
        store.save_published(&["a.mp3".to_string()]).unwrap();
        assert_eq!(store.load_published(), vec!["a.mp3"]);
    }
}
