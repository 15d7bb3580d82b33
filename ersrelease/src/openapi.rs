//! Documentation OpenAPI pour l'API de publication

use utoipa::OpenApi;

/// Documentation OpenAPI pour l'API releases
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::list_files,
        crate::api::list_published,
        crate::api::list_scheduled,
        crate::api::get_state,
        crate::api::publish,
        crate::api::unpublish,
        crate::api::cancel_schedule,
        crate::api::reconcile,
        crate::sse::release_events_sse,
    ),
    components(
        schemas(
            crate::ScheduledItem,
            crate::ReleaseState,
            crate::api::PublishBody,
            crate::api::UnpublishBody,
            crate::api::CancelScheduleBody,
            crate::api::PublishResponse,
            crate::api::UnpublishResponse,
            crate::api::CancelScheduleResponse,
            crate::api::ReconcileResponse,
            crate::api::ErrorResponse,
        )
    ),
    tags(
        (name = "releases", description = "Publication immédiate et planifiée des morceaux")
    ),
    info(
        title = "EchoRiftSounds Release API",
        version = "0.1.0",
        description = r#"
# Publication des morceaux

- `files` : morceaux du répertoire média
- `published` / `scheduled` / `state` : état courant
- `publish` : publication immédiate (`files`) et/ou planifiée (`scheduled: [{file, time}]`)
- `unpublish` : retrait de la liste publiée
- `scheduled/cancel` : annulation de toutes les planifications d'un fichier
- `reconcile` : publication immédiate des éléments échus
- `events` : flux SSE des modifications

Noms acceptés : sans `/`, `\` ni `..`, 255 caractères au plus, extension `.mp3`, `.wav` ou `.flac`.
        "#,
        license(
            name = "MIT",
        ),
    )
)]
pub struct ApiDoc;
