//! Migration des morceaux planifiés arrivés à échéance vers la liste publiée

use crate::schedule::ScheduledItem;
use crate::store::{StateStore, StoredEntry};
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info};

/// Sépare la file en (échus, en attente) en conservant l'ordre de chaque groupe
///
/// Une entrée illisible n'est jamais échue et reste dans la file.
pub fn partition_due(
    entries: Vec<StoredEntry<ScheduledItem>>,
    now: DateTime<Utc>,
) -> (Vec<ScheduledItem>, Vec<StoredEntry<ScheduledItem>>) {
    let mut due = Vec::new();
    let mut pending = Vec::new();
    for entry in entries {
        match entry {
            StoredEntry::Parsed(item) if item.is_due(now) => due.push(item),
            other => pending.push(other),
        }
    }
    (due, pending)
}

/// Union ordonnée : `existing` puis les nouveaux noms, sans doublon
pub fn merge_unique<I>(existing: Vec<String>, additions: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::with_capacity(existing.len());
    existing
        .into_iter()
        .chain(additions)
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Ajoute `additions` au document publié, entrées illisibles conservées
///
/// Retourne le document complet et les noms réellement ajoutés.
pub fn merge_published<I>(
    existing: Vec<StoredEntry<String>>,
    additions: I,
) -> (Vec<StoredEntry<String>>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::with_capacity(existing.len());
    let mut merged = Vec::with_capacity(existing.len());
    for entry in existing {
        match entry {
            StoredEntry::Parsed(name) => {
                if seen.insert(name.clone()) {
                    merged.push(StoredEntry::Parsed(name));
                }
            }
            unparsed => merged.push(unparsed),
        }
    }

    let mut added = Vec::new();
    for name in additions {
        if seen.insert(name.clone()) {
            added.push(name.clone());
            merged.push(StoredEntry::Parsed(name));
        }
    }
    (merged, added)
}

/// Publie les éléments échus à `now` et retourne les noms publiés
///
/// Rien n'est écrit s'il n'y a aucun élément échu. La liste publiée est
/// écrite avant la file : si cette première écriture échoue, la file reste
/// intacte et les éléments seront repris au prochain passage.
pub fn reconcile(store: &StateStore, now: DateTime<Utc>) -> Result<Vec<String>> {
    let queue = store.load_scheduled_entries();
    debug!(count = queue.len(), now = %now, "Checking scheduled tracks");

    let (due, pending) = partition_due(queue, now);
    if due.is_empty() {
        return Ok(Vec::new());
    }

    let released = merge_unique(Vec::new(), due.into_iter().map(|item| item.file));

    let (published, _) = merge_published(store.load_published_entries(), released.iter().cloned());
    store.save_published_entries(&published)?;
    store.save_scheduled_entries(&pending)?;

    info!(released = ?released, remaining = pending.len(), "Released scheduled tracks");
    Ok(released)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use chrono::TimeZone;
    use serde_json::{json, Value};
    use std::fs;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn store() -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::in_dir(dir.path());
        (dir, store)
    }

    #[test]
    fn test_partition_preserves_order() {
        let now = at(2024, 6, 1);
        let items = vec![
            ScheduledItem::new("a.mp3", at(2024, 7, 1)),
            ScheduledItem::new("b.mp3", at(2024, 1, 1)),
            ScheduledItem::new("c.mp3", at(2024, 8, 1)),
            ScheduledItem::new("d.mp3", now),
        ];

        let mut entries: Vec<_> = items.into_iter().map(StoredEntry::Parsed).collect();
        entries.insert(1, StoredEntry::Unparsed(json!({"file": "x.mp3"})));

        let (due, pending) = partition_due(entries, now);
        let due: Vec<_> = due.into_iter().map(|i| i.file).collect();
        assert_eq!(due, vec!["b.mp3", "d.mp3"]);
        assert_eq!(
            pending,
            vec![
                StoredEntry::Parsed(ScheduledItem::new("a.mp3", at(2024, 7, 1))),
                StoredEntry::Unparsed(json!({"file": "x.mp3"})),
                StoredEntry::Parsed(ScheduledItem::new("c.mp3", at(2024, 8, 1))),
            ]
        );
    }

    #[test]
    fn test_merge_unique() {
        let merged = merge_unique(
            vec!["a.mp3".to_string(), "b.mp3".to_string()],
            vec!["b.mp3".to_string(), "c.mp3".to_string(), "c.mp3".to_string()],
        );
        assert_eq!(merged, vec!["a.mp3", "b.mp3", "c.mp3"]);
    }

    #[test]
    fn test_merge_published_keeps_unreadable_entries() {
        let existing = vec![
            StoredEntry::Parsed("a.mp3".to_string()),
            StoredEntry::Unparsed(json!(42)),
        ];

        let (merged, added) =
            merge_published(existing, vec!["a.mp3".to_string(), "b.mp3".to_string()]);

        assert_eq!(added, vec!["b.mp3"]);
        assert_eq!(
            merged,
            vec![
                StoredEntry::Parsed("a.mp3".to_string()),
                StoredEntry::Unparsed(json!(42)),
                StoredEntry::Parsed("b.mp3".to_string()),
            ]
        );
    }

    #[test]
    fn test_due_item_is_released() {
        let (_dir, store) = store();
        store
            .save_scheduled(&[ScheduledItem::new("a.mp3", at(2024, 1, 1))])
            .unwrap();
        store.save_published(&[]).unwrap();

        let released = reconcile(&store, at(2024, 6, 1)).unwrap();

        assert_eq!(released, vec!["a.mp3"]);
        assert_eq!(store.load_published(), vec!["a.mp3"]);
        assert!(store.load_scheduled().is_empty());
    }

    #[test]
    fn test_future_item_is_untouched() {
        let (_dir, store) = store();
        let item = ScheduledItem::new("later.mp3", at(2030, 1, 1));
        store.save_scheduled(std::slice::from_ref(&item)).unwrap();

        let released = reconcile(&store, at(2024, 6, 1)).unwrap();

        assert!(released.is_empty());
        assert_eq!(store.load_scheduled(), vec![item]);
        // Aucune écriture quand rien n'est échu
        assert!(!store.published_path().exists());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let (_dir, store) = store();
        store.save_published(&["old.mp3".to_string()]).unwrap();
        store
            .save_scheduled(&[
                ScheduledItem::new("a.mp3", at(2024, 1, 1)),
                ScheduledItem::new("b.mp3", at(2030, 1, 1)),
            ])
            .unwrap();
        let now = at(2024, 6, 1);

        reconcile(&store, now).unwrap();
        let published = store.load_published();
        let scheduled = store.load_scheduled();

        let second = reconcile(&store, now).unwrap();
        assert!(second.is_empty());
        assert_eq!(store.load_published(), published);
        assert_eq!(store.load_scheduled(), scheduled);
        assert_eq!(published, vec!["old.mp3", "a.mp3"]);
    }

    #[test]
    fn test_already_published_file_is_not_duplicated() {
        let (_dir, store) = store();
        store.save_published(&["a.mp3".to_string()]).unwrap();
        store
            .save_scheduled(&[
                ScheduledItem::new("a.mp3", at(2024, 1, 1)),
                ScheduledItem::new("a.mp3", at(2024, 2, 1)),
            ])
            .unwrap();

        let released = reconcile(&store, at(2024, 6, 1)).unwrap();
        assert_eq!(released, vec!["a.mp3"]);
        assert_eq!(store.load_published(), vec!["a.mp3"]);
    }

    #[test]
    fn test_unreadable_queue_entry_is_kept_on_release() {
        let (_dir, store) = store();
        fs::write(
            store.scheduled_path(),
            r#"[{"file": "keep.mp3", "time": "next spring"}, {"file": "a.mp3", "time": "2024-01-01T00:00:00Z"}]"#,
        )
        .unwrap();

        let released = reconcile(&store, at(2024, 6, 1)).unwrap();

        assert_eq!(released, vec!["a.mp3"]);
        let raw: Value =
            serde_json::from_str(&fs::read_to_string(store.scheduled_path()).unwrap()).unwrap();
        assert_eq!(raw, json!([{"file": "keep.mp3", "time": "next spring"}]));
    }

    #[test]
    fn test_failed_published_write_leaves_queue_intact() {
        let (_dir, store) = store();
        store
            .save_scheduled(&[ScheduledItem::new("a.mp3", at(2024, 1, 1))])
            .unwrap();
        // Un répertoire à la place du document rend le renommage impossible
        fs::create_dir(store.published_path()).unwrap();
        let before = fs::read(store.scheduled_path()).unwrap();

        let err = reconcile(&store, at(2024, 6, 1)).unwrap_err();

        assert!(matches!(err, Error::Storage { .. }));
        assert_eq!(fs::read(store.scheduled_path()).unwrap(), before);
    }
}
