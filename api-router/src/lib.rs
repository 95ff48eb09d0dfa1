use api_state::ApiState;
use axum::{
    extract::FromRef,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use middleware_api_auth::{admin_only, api_auth};
use routes::{
    import_jobs::{create_import_job, get_import_job, list_import_jobs},
    liveness::live,
    readiness::ready,
    videos::{create_video, get_video, list_videos, video_statistics},
};

pub mod api_state;
pub mod error;
mod middleware_api_auth;
mod routes;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Public, unauthenticated endpoints (for k8s/systemd probes)
    let public = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    // Read endpoints for any authenticated user
    let authenticated = Router::new()
        .route("/videos", get(list_videos))
        .route("/videos/statistics", get(video_statistics))
        .route("/videos/{id}", get(get_video));

    // Import orchestration and manual catalog writes are admin-only
    let admin = Router::new()
        .route("/import-jobs", post(create_import_job).get(list_import_jobs))
        .route("/import-jobs/{id}", get(get_import_job))
        .route("/videos", post(create_video))
        .route_layer(from_fn(admin_only));

    let protected = authenticated
        .merge(admin)
        .route_layer(from_fn_with_state(app_state.clone(), api_auth));

    public.merge(protected)
}
