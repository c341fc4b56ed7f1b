//! Preview proxy for sandboxed projects.
//!
//! Serves `/api/preview/{project_id}/...` by checking that the caller may view
//! the project, then fetching the requested file from the project's sandbox.
//! Several candidate URLs are tried in order because a sandbox's static file
//! server may answer a directory either at `{path}/index.html` or at `{path}`.

pub mod candidates;
pub mod config;
pub mod errors;
mod metrics_defs;
pub mod relay;
pub mod resolver;
pub mod routes;
pub mod service;

#[cfg(test)]
mod testutils;

pub use errors::PreviewError;

use project_access::ProjectAccess;
use resolver::Resolver;
use service::{PreviewHandler, PreviewService};
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use shared::metrics_defs::describe_metrics;

pub async fn run(config: config::Config) -> Result<(), PreviewError> {
    describe_metrics(metrics_defs::ALL_METRICS);
    describe_metrics(project_access::ALL_METRICS);

    let store = project_access::get_store(config.access.store.clone())?;
    let handler = PreviewHandler::new(
        ProjectAccess::new(store),
        Resolver::new(&config.upstream)?,
        config.access.session_cookie.clone(),
        config.relay.cache_max_age_secs,
    );

    let preview_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        PreviewService::new(handler),
    );
    // No warm-up: every lookup is made per request, so the service is ready once listening.
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::<_, PreviewError>::new(|| true),
    );

    tokio::try_join!(preview_task, admin_task)?;
    Ok(())
}
