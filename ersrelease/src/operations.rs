//! Opérations de publication, dépublication et planification
//!
//! Chaque opération recharge les documents, valide toute l'entrée avant la
//! moindre écriture, puis sauvegarde. La sérialisation des appels concurrents
//! est assurée par [`ReleaseManager`](crate::ReleaseManager).

use crate::filename::FilenamePolicy;
use crate::reconcile::merge_published;
use crate::schedule::{parse_release_time, ScheduleEntry, ScheduledItem};
use crate::store::{StateStore, StoredEntry};
use crate::{Error, Result};
use std::collections::HashSet;

/// Règles appliquées aux entrées de l'opérateur
#[derive(Debug, Clone, Default)]
pub struct ReleaseRules {
    policy: FilenamePolicy,
    available: Option<HashSet<String>>,
}

impl ReleaseRules {
    pub fn new(policy: FilenamePolicy) -> Self {
        Self {
            policy,
            available: None,
        }
    }

    /// Restreint publication et planification aux fichiers listés
    pub fn with_available_media<I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.available = Some(names.into_iter().collect());
        self
    }

    pub fn policy(&self) -> &FilenamePolicy {
        &self.policy
    }

    /// Vérifie uniquement la forme des noms
    pub fn check_names(&self, files: &[String]) -> Result<()> {
        let invalid = self.policy.invalid_names(files);
        if invalid.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidFilenames(invalid))
        }
    }

    /// Forme des noms puis présence dans le répertoire média si exigée
    pub fn check_files(&self, files: &[String]) -> Result<()> {
        self.check_names(files)?;
        self.check_available(files.iter())
    }

    /// Valide des demandes de planification et les convertit
    pub fn check_schedule(&self, entries: &[ScheduleEntry]) -> Result<Vec<ScheduledItem>> {
        let mut items = Vec::with_capacity(entries.len());
        let mut invalid = Vec::new();

        for entry in entries {
            let time = if self.policy.is_valid(&entry.file) {
                parse_release_time(&entry.time)
            } else {
                None
            };

            match time {
                Some(time) => items.push(ScheduledItem::new(entry.file.clone(), time)),
                None => invalid.push(entry.describe()),
            }
        }

        if !invalid.is_empty() {
            return Err(Error::InvalidScheduledItems(invalid));
        }

        self.check_available(items.iter().map(|item| &item.file))?;
        Ok(items)
    }

    fn check_available<'a, I>(&self, files: I) -> Result<()>
    where
        I: Iterator<Item = &'a String>,
    {
        let Some(available) = &self.available else {
            return Ok(());
        };

        let missing: Vec<String> = files
            .filter(|name| !available.contains(name.as_str()))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingMedia(missing))
        }
    }
}

/// Demande combinée : publication immédiate et/ou planification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishRequest {
    pub files: Option<Vec<String>>,
    pub scheduled: Option<Vec<ScheduleEntry>>,
}

impl PublishRequest {
    pub fn now(files: Vec<String>) -> Self {
        Self {
            files: Some(files),
            scheduled: None,
        }
    }

    pub fn later(scheduled: Vec<ScheduleEntry>) -> Self {
        Self {
            files: None,
            scheduled: Some(scheduled),
        }
    }
}

/// Résultat d'une publication combinée
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Noms ajoutés à la liste publiée (absents auparavant)
    pub published: Vec<String>,
    /// Éléments ajoutés en fin de file
    pub scheduled: Vec<ScheduledItem>,
}

/// Ajoute `files` à la liste publiée ; retourne les noms réellement ajoutés
pub fn publish_now(store: &StateStore, rules: &ReleaseRules, files: &[String]) -> Result<Vec<String>> {
    rules.check_files(files)?;
    publish_files(store, files)
}

/// Ajoute des éléments en fin de file, dans l'ordre donné
pub fn schedule(
    store: &StateStore,
    rules: &ReleaseRules,
    entries: &[ScheduleEntry],
) -> Result<Vec<ScheduledItem>> {
    let items = rules.check_schedule(entries)?;
    append_scheduled(store, &items)?;
    Ok(items)
}

/// Publication combinée ; les deux listes sont validées avant toute écriture
pub fn publish(store: &StateStore, rules: &ReleaseRules, request: &PublishRequest) -> Result<PublishOutcome> {
    if request.files.is_none() && request.scheduled.is_none() {
        return Err(Error::EmptyRequest);
    }

    let files = request.files.as_deref().unwrap_or_default();
    rules.check_files(files)?;

    let items = match &request.scheduled {
        Some(entries) => rules.check_schedule(entries)?,
        None => Vec::new(),
    };

    let published = publish_files(store, files)?;
    append_scheduled(store, &items)?;

    Ok(PublishOutcome {
        published,
        scheduled: items,
    })
}

/// Retire `files` de la liste publiée ; les noms absents sont ignorés
///
/// Les entrées illisibles du document ne sont jamais retirées.
pub fn unpublish(store: &StateStore, rules: &ReleaseRules, files: &[String]) -> Result<Vec<String>> {
    rules.check_names(files)?;

    let targets: HashSet<&str> = files.iter().map(String::as_str).collect();
    let mut removed = Vec::new();
    let mut kept = Vec::new();
    for entry in store.load_published_entries() {
        match entry {
            StoredEntry::Parsed(name) if targets.contains(name.as_str()) => removed.push(name),
            other => kept.push(other),
        }
    }

    store.save_published_entries(&kept)?;
    Ok(removed)
}

/// Retire de la file toutes les planifications des fichiers visés
///
/// Une entrée illisible dont le champ `file` est visé est aussi retirée,
/// mais n'apparaît pas dans le résultat.
pub fn cancel_schedule(
    store: &StateStore,
    rules: &ReleaseRules,
    files: &[String],
) -> Result<Vec<ScheduledItem>> {
    rules.check_names(files)?;

    let targets: HashSet<&str> = files.iter().map(String::as_str).collect();
    let mut removed = Vec::new();
    let mut kept = Vec::new();
    for entry in store.load_scheduled_entries() {
        match entry {
            StoredEntry::Parsed(item) if targets.contains(item.file.as_str()) => removed.push(item),
            StoredEntry::Unparsed(value)
                if value
                    .get("file")
                    .and_then(|file| file.as_str())
                    .is_some_and(|file| targets.contains(file)) => {}
            other => kept.push(other),
        }
    }

    store.save_scheduled_entries(&kept)?;
    Ok(removed)
}

fn publish_files(store: &StateStore, files: &[String]) -> Result<Vec<String>> {
    let (published, added) = merge_published(store.load_published_entries(), files.iter().cloned());
    store.save_published_entries(&published)?;
    Ok(added)
}

fn append_scheduled(store: &StateStore, items: &[ScheduledItem]) -> Result<()> {
    let mut queue = store.load_scheduled_entries();
    queue.extend(items.iter().cloned().map(StoredEntry::Parsed));
    store.save_scheduled_entries(&queue)
}
