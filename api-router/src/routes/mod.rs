pub mod import_jobs;
pub mod liveness;
pub mod readiness;
pub mod videos;
