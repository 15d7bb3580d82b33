//! API REST de publication et de planification
//!
//! Monté sous `/api/releases` par [`ReleaseServerExt`](crate::ReleaseServerExt).
//! Les listes de fichiers acceptent une chaîne seule ou un tableau ; une
//! entrée qui n'est pas une chaîne est rapportée comme nom invalide.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;
use utoipa::ToSchema;

use crate::operations::PublishRequest;
use crate::schedule::{ReleaseState, ScheduleEntry, ScheduledItem};
use crate::{Error, ReleaseManager};

/// Router `/api/releases` combinant les endpoints REST et le flux SSE
pub fn release_api_router(manager: ReleaseManager) -> Router {
    Router::new()
        .route("/files", get(list_files))
        .route("/published", get(list_published))
        .route("/scheduled", get(list_scheduled))
        .route("/state", get(get_state))
        .route("/publish", post(publish))
        .route("/unpublish", post(unpublish))
        .route("/scheduled/cancel", post(cancel_schedule))
        .route("/reconcile", post(reconcile))
        .route("/events", get(crate::sse::release_events_sse))
        .with_state(manager)
}

/// Requête de publication immédiate et/ou planifiée
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PublishBody {
    /// Nom ou liste de noms à publier immédiatement
    #[serde(default)]
    #[schema(value_type = Option<Vec<String>>, example = json!(["Song Title.mp3"]))]
    pub files: Option<Value>,
    /// Élément ou liste d'éléments `{file, time}` à planifier
    #[serde(default)]
    #[schema(value_type = Option<Vec<ScheduledItem>>)]
    pub scheduled: Option<Value>,
}

/// Requête de dépublication
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UnpublishBody {
    #[serde(default, alias = "filesToDelete")]
    #[schema(value_type = Option<Vec<String>>)]
    pub files: Option<Value>,
}

/// Requête d'annulation de planification
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CancelScheduleBody {
    #[serde(default, alias = "scheduledToDelete")]
    #[schema(value_type = Option<Vec<String>>)]
    pub files: Option<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PublishResponse {
    /// Noms nouvellement publiés
    pub published: Vec<String>,
    /// Éléments ajoutés à la file
    pub scheduled: Vec<ScheduledItem>,
    pub state: ReleaseState,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnpublishResponse {
    pub removed: Vec<String>,
    pub state: ReleaseState,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelScheduleResponse {
    pub removed: Vec<ScheduledItem>,
    pub state: ReleaseState,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReconcileResponse {
    pub released: Vec<String>,
}

/// Réponse d'erreur REST générique
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// Entrées rejetées, le cas échéant
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/api/releases/files",
    tag = "releases",
    responses(
        (status = 200, description = "Fichiers audio du répertoire média", body = [String]),
        (status = 500, description = "Répertoire média illisible", body = ErrorResponse)
    )
)]
pub async fn list_files(State(manager): State<ReleaseManager>) -> Response {
    match manager.media_files().await {
        Ok(files) => (StatusCode::OK, Json(files)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/releases/published",
    tag = "releases",
    responses(
        (status = 200, description = "Morceaux publiés", body = [String]),
        (status = 500, description = "Tâche de lecture interrompue", body = ErrorResponse)
    )
)]
pub async fn list_published(State(manager): State<ReleaseManager>) -> Response {
    match manager.published().await {
        Ok(published) => (StatusCode::OK, Json(published)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/releases/scheduled",
    tag = "releases",
    responses(
        (status = 200, description = "File des publications planifiées", body = [ScheduledItem]),
        (status = 500, description = "Tâche de lecture interrompue", body = ErrorResponse)
    )
)]
pub async fn list_scheduled(State(manager): State<ReleaseManager>) -> Response {
    match manager.scheduled().await {
        Ok(scheduled) => (StatusCode::OK, Json(scheduled)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/releases/state",
    tag = "releases",
    responses(
        (status = 200, description = "Morceaux publiés et planifiés", body = ReleaseState),
        (status = 500, description = "Tâche de lecture interrompue", body = ErrorResponse)
    )
)]
pub async fn get_state(State(manager): State<ReleaseManager>) -> Response {
    match manager.state().await {
        Ok(state) => (StatusCode::OK, Json(state)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/releases/publish",
    tag = "releases",
    request_body = PublishBody,
    responses(
        (status = 200, description = "Publication appliquée", body = PublishResponse),
        (status = 400, description = "Requête vide ou entrées invalides", body = ErrorResponse),
        (status = 500, description = "Écriture impossible", body = ErrorResponse)
    )
)]
pub async fn publish(State(manager): State<ReleaseManager>, Json(body): Json<PublishBody>) -> Response {
    let request = PublishRequest {
        files: as_list(body.files).map(to_names),
        scheduled: as_list(body.scheduled).map(|values| values.into_iter().map(to_entry).collect()),
    };

    let result = async {
        let outcome = manager.publish(&request).await?;
        Ok::<_, Error>(PublishResponse {
            published: outcome.published,
            scheduled: outcome.scheduled,
            state: manager.state().await?,
        })
    }
    .await;

    match result {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/releases/unpublish",
    tag = "releases",
    request_body = UnpublishBody,
    responses(
        (status = 200, description = "Morceaux retirés (les noms absents sont ignorés)", body = UnpublishResponse),
        (status = 400, description = "Noms invalides", body = ErrorResponse),
        (status = 500, description = "Écriture impossible", body = ErrorResponse)
    )
)]
pub async fn unpublish(State(manager): State<ReleaseManager>, Json(body): Json<UnpublishBody>) -> Response {
    let files = as_list(body.files).map(to_names).unwrap_or_default();

    let result = async {
        let removed = manager.unpublish(&files).await?;
        Ok::<_, Error>(UnpublishResponse {
            removed,
            state: manager.state().await?,
        })
    }
    .await;

    match result {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/releases/scheduled/cancel",
    tag = "releases",
    request_body = CancelScheduleBody,
    responses(
        (status = 200, description = "Planifications annulées", body = CancelScheduleResponse),
        (status = 400, description = "Noms invalides", body = ErrorResponse),
        (status = 500, description = "Écriture impossible", body = ErrorResponse)
    )
)]
pub async fn cancel_schedule(
    State(manager): State<ReleaseManager>,
    Json(body): Json<CancelScheduleBody>,
) -> Response {
    let files = as_list(body.files).map(to_names).unwrap_or_default();

    let result = async {
        let removed = manager.cancel_schedule(&files).await?;
        Ok::<_, Error>(CancelScheduleResponse {
            removed,
            state: manager.state().await?,
        })
    }
    .await;

    match result {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/releases/reconcile",
    tag = "releases",
    responses(
        (status = 200, description = "Morceaux publiés par la réconciliation", body = ReconcileResponse),
        (status = 500, description = "Écriture impossible", body = ErrorResponse)
    )
)]
pub async fn reconcile(State(manager): State<ReleaseManager>) -> Response {
    match manager.reconcile_now().await {
        Ok(released) => (StatusCode::OK, Json(ReconcileResponse { released })).into_response(),
        Err(err) => map_error(err),
    }
}

/// Valeur absente, nulle ou "fausse" : pas de liste ; valeur seule : liste d'un élément
fn as_list(value: Option<Value>) -> Option<Vec<Value>> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(values) => Some(values),
        other => Some(vec![other]),
    }
}

fn to_name(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn to_names(values: Vec<Value>) -> Vec<String> {
    values.into_iter().map(to_name).collect()
}

fn to_entry(value: Value) -> ScheduleEntry {
    match value {
        Value::Object(mut map) => ScheduleEntry {
            file: map.remove("file").map(to_name).unwrap_or_default(),
            time: map.remove("time").map(to_name).unwrap_or_default(),
        },
        other => ScheduleEntry::new(to_name(other), ""),
    }
}

fn map_error(error: Error) -> Response {
    let (status, code) = match &error {
        Error::InvalidFilenames(_) => (StatusCode::BAD_REQUEST, "INVALID_FILENAMES"),
        Error::InvalidScheduledItems(_) => (StatusCode::BAD_REQUEST, "INVALID_SCHEDULED_ITEMS"),
        Error::EmptyRequest => (StatusCode::BAD_REQUEST, "EMPTY_REQUEST"),
        Error::MissingMedia(_) => (StatusCode::BAD_REQUEST, "MISSING_MEDIA"),
        Error::Storage { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        Error::Serialization(_) | Error::Other(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
    };

    if !error.is_user_error() {
        error!("Release API error: {}", error);
    }

    let entries = match &error {
        Error::InvalidFilenames(entries)
        | Error::InvalidScheduledItems(entries)
        | Error::MissingMedia(entries) => entries.clone(),
        _ => Vec::new(),
    };

    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            message: error.to_string(),
            entries,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_list_normalisation() {
        assert_eq!(as_list(None), None);
        assert_eq!(as_list(Some(Value::Null)), None);
        assert_eq!(as_list(Some(json!(""))), None);
        assert_eq!(as_list(Some(json!(false))), None);
        assert_eq!(as_list(Some(json!("a.mp3"))), Some(vec![json!("a.mp3")]));
        assert_eq!(as_list(Some(json!([]))), Some(vec![]));
    }

    #[test]
    fn test_non_string_names_stay_invalid() {
        let names = to_names(vec![json!("a.mp3"), json!(42), json!({"x": 1})]);
        assert_eq!(names, vec!["a.mp3", "42", r#"{"x":1}"#]);
    }

    #[test]
    fn test_to_entry() {
        assert_eq!(
            to_entry(json!({"file": "a.mp3", "time": "2030-01-01"})),
            ScheduleEntry::new("a.mp3", "2030-01-01")
        );
        assert_eq!(to_entry(json!({"file": "a.mp3"})), ScheduleEntry::new("a.mp3", ""));
        assert_eq!(to_entry(json!(null)), ScheduleEntry::new("null", ""));
    }
}
