//! SSE pour suivre les publications, dépublications et planifications
//!
//! Route : `GET /api/releases/events`

use crate::ReleaseManager;
use async_stream::stream;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

/// Handler SSE : un évènement `release` par modification de l'état
#[utoipa::path(
    get,
    path = "/api/releases/events",
    tag = "releases",
    responses(
        (status = 200, description = "Flux SSE des évènements (published, unpublished, scheduled, schedule_cancelled, released)", content_type = "text/event-stream")
    )
)]
pub async fn release_events_sse(State(manager): State<ReleaseManager>) -> impl IntoResponse {
    let mut rx = manager.subscribe();

    let stream = stream! {
        loop {
            match rx.recv().await {
                Ok(envelope) => {
                    if let Ok(json) = serde_json::to_string(&envelope) {
                        yield Ok::<_, axum::Error>(Event::default().event("release").data(json));
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Release event subscriber lagging");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
