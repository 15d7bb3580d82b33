//! ReleaseManager : point d'entrée unique des opérations sur l'état publié
//!
//! Toutes les séquences lecture-modification-écriture (réconciliation et
//! opérations de l'opérateur) passent par un même verrou asynchrone : deux
//! requêtes simultanées du processus ne peuvent plus s'écraser mutuellement.
//! Plusieurs processus partageant le même répertoire d'état ne sont pas
//! protégés par ce verrou.

use crate::library::list_media;
use crate::operations::{self, PublishOutcome, PublishRequest, ReleaseRules};
use crate::reconcile::reconcile;
use crate::schedule::{ReleaseState, ScheduleEntry, ScheduledItem};
use crate::settings::ReleaseSettings;
use crate::store::StateStore;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Évènement émis après chaque modification effective de l'état
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReleaseEvent {
    /// Fichiers ajoutés à la liste publiée par l'opérateur
    Published { files: Vec<String> },
    /// Fichiers retirés de la liste publiée
    Unpublished { files: Vec<String> },
    /// Éléments ajoutés à la file
    Scheduled { items: Vec<ScheduledItem> },
    /// Éléments retirés de la file par l'opérateur
    ScheduleCancelled { items: Vec<ScheduledItem> },
    /// Fichiers publiés par la réconciliation
    Released { files: Vec<String> },
}

/// Évènement horodaté pour diffusion
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseEventEnvelope {
    #[serde(flatten)]
    pub event: ReleaseEvent,
    pub timestamp: DateTime<Utc>,
}

struct ManagerInner {
    settings: ReleaseSettings,
    store: Mutex<StateStore>,
    event_tx: broadcast::Sender<ReleaseEventEnvelope>,
}

/// Gestionnaire de publication (clonage peu coûteux)
#[derive(Clone)]
pub struct ReleaseManager {
    inner: Arc<ManagerInner>,
}

impl ReleaseManager {
    /// Crée le gestionnaire ; le répertoire d'état est créé si besoin
    pub fn new(settings: ReleaseSettings) -> Result<Self> {
        std::fs::create_dir_all(&settings.state_dir)
            .map_err(|e| Error::storage(&settings.state_dir, e))?;

        let store = settings.store();
        Ok(Self {
            inner: Arc::new(ManagerInner {
                settings,
                store: Mutex::new(store),
                event_tx: broadcast::channel(256).0,
            }),
        })
    }

    pub fn settings(&self) -> &ReleaseSettings {
        &self.inner.settings
    }

    /// S'abonne aux évènements de publication
    pub fn subscribe(&self) -> broadcast::Receiver<ReleaseEventEnvelope> {
        self.inner.event_tx.subscribe()
    }

    fn emit(&self, event: ReleaseEvent) {
        let envelope = ReleaseEventEnvelope {
            event,
            timestamp: Utc::now(),
        };
        // Pas d'abonné : rien à faire
        let _ = self.inner.event_tx.send(envelope);
    }

    /// Exécute `f` sur le store, verrou tenu, hors des workers asynchrones
    async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&StateStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let guard = self.inner.store.lock().await;
        let store = guard.clone();
        let result = tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(anyhow::Error::from)?;
        drop(guard);
        result
    }

    /// Crée les documents d'état absents (collections vides)
    pub async fn init_documents(&self) -> Result<()> {
        self.with_store(|store| {
            if !store.published_path().exists() {
                store.save_published(&[])?;
            }
            if !store.scheduled_path().exists() {
                store.save_scheduled(&[])?;
            }
            Ok(())
        })
        .await
    }

    /// Réconcilie à l'instant présent
    pub async fn reconcile_now(&self) -> Result<Vec<String>> {
        self.reconcile_at(Utc::now()).await
    }

    /// Publie les éléments de la file échus à `now`
    pub async fn reconcile_at(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let released = self.with_store(move |store| reconcile(store, now)).await?;

        if !released.is_empty() {
            self.emit(ReleaseEvent::Released {
                files: released.clone(),
            });
        }
        Ok(released)
    }

    /// Publication combinée (immédiate et/ou planifiée)
    pub async fn publish(&self, request: &PublishRequest) -> Result<PublishOutcome> {
        let settings = self.inner.settings.clone();
        let request = request.clone();
        let outcome = self
            .with_store(move |store| operations::publish(store, &release_rules(&settings)?, &request))
            .await?;

        info!(
            published = ?outcome.published,
            scheduled = outcome.scheduled.len(),
            "Publish request applied"
        );
        self.emit_published(&outcome.published);
        self.emit_scheduled(&outcome.scheduled);
        Ok(outcome)
    }

    /// Publication immédiate ; retourne les noms ajoutés
    pub async fn publish_now(&self, files: &[String]) -> Result<Vec<String>> {
        let settings = self.inner.settings.clone();
        let files = files.to_vec();
        let added = self
            .with_store(move |store| operations::publish_now(store, &release_rules(&settings)?, &files))
            .await?;

        info!(files = ?added, "Published tracks");
        self.emit_published(&added);
        Ok(added)
    }

    /// Planifie des publications ; retourne les éléments ajoutés
    pub async fn schedule(&self, entries: &[ScheduleEntry]) -> Result<Vec<ScheduledItem>> {
        let settings = self.inner.settings.clone();
        let entries = entries.to_vec();
        let items = self
            .with_store(move |store| operations::schedule(store, &release_rules(&settings)?, &entries))
            .await?;

        for item in &items {
            debug!(file = %item.file, time = %item.time, "Track scheduled");
        }
        info!(count = items.len(), "Scheduled tracks");
        self.emit_scheduled(&items);
        Ok(items)
    }

    /// Retire des fichiers de la liste publiée ; retourne les noms retirés
    pub async fn unpublish(&self, files: &[String]) -> Result<Vec<String>> {
        let rules = ReleaseRules::new(self.inner.settings.filenames.clone());
        let targets = files.to_vec();
        let removed = self
            .with_store(move |store| operations::unpublish(store, &rules, &targets))
            .await?;

        info!(requested = ?files, removed = ?removed, "Unpublished tracks");
        if !removed.is_empty() {
            self.emit(ReleaseEvent::Unpublished { files: removed.clone() });
        }
        Ok(removed)
    }

    /// Annule toutes les planifications des fichiers donnés
    pub async fn cancel_schedule(&self, files: &[String]) -> Result<Vec<ScheduledItem>> {
        let rules = ReleaseRules::new(self.inner.settings.filenames.clone());
        let targets = files.to_vec();
        let removed = self
            .with_store(move |store| operations::cancel_schedule(store, &rules, &targets))
            .await?;

        info!(requested = ?files, removed = removed.len(), "Cancelled scheduled tracks");
        if !removed.is_empty() {
            self.emit(ReleaseEvent::ScheduleCancelled { items: removed.clone() });
        }
        Ok(removed)
    }

    pub async fn published(&self) -> Result<Vec<String>> {
        self.with_store(|store| Ok(store.load_published())).await
    }

    pub async fn scheduled(&self) -> Result<Vec<ScheduledItem>> {
        self.with_store(|store| Ok(store.load_scheduled())).await
    }

    /// Vue cohérente des deux collections
    pub async fn state(&self) -> Result<ReleaseState> {
        self.with_store(|store| {
            Ok(ReleaseState {
                published: store.load_published(),
                scheduled: store.load_scheduled(),
            })
        })
        .await
    }

    /// Fichiers audio disponibles dans le répertoire média
    pub async fn media_files(&self) -> Result<Vec<String>> {
        let settings = self.inner.settings.clone();
        tokio::task::spawn_blocking(move || list_media(&settings.media_dir, &settings.filenames))
            .await
            .map_err(anyhow::Error::from)?
    }

    /// Lance la réconciliation périodique en tâche de fond
    pub fn spawn_scheduler(&self) -> JoinHandle<()> {
        let manager = self.clone();
        let period = self.inner.settings.reconcile_interval.max(Duration::from_secs(1));
        info!(period_secs = period.as_secs(), "Starting release scheduler");

        tokio::spawn(async move {
            loop {
                if let Err(e) = manager.reconcile_now().await {
                    error!("Scheduled reconciliation failed: {}", e);
                }
                tokio::time::sleep(period).await;
            }
        })
    }

    fn emit_published(&self, files: &[String]) {
        if !files.is_empty() {
            self.emit(ReleaseEvent::Published {
                files: files.to_vec(),
            });
        }
    }

    fn emit_scheduled(&self, items: &[ScheduledItem]) {
        if !items.is_empty() {
            self.emit(ReleaseEvent::Scheduled {
                items: items.to_vec(),
            });
        }
    }
}

/// Règles courantes ; liste le répertoire média si sa présence est exigée
fn release_rules(settings: &ReleaseSettings) -> Result<ReleaseRules> {
    let rules = ReleaseRules::new(settings.filenames.clone());

    if settings.require_existing_media {
        let media = list_media(&settings.media_dir, &settings.filenames)?;
        Ok(rules.with_available_media(media))
    } else {
        Ok(rules)
    }
}
