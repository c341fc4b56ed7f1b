//! Maps inbound paths onto the preview routes:
//!
//! - `/api/preview/{project_id}/{...path}`
//! - `/api/preview/{project_id}/p/{port}`
//! - `/api/preview/{project_id}/p/{port}/{...path}`

use thiserror::Error;

const PREVIEW_PREFIX: &str = "/api/preview/";
const PORT_SEGMENT: &str = "p";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRequest {
    pub project_id: String,
    /// Replaces the port encoded in the sandbox URL
    pub port: Option<u16>,
    /// Requested path below the sandbox root, segments joined by `/`
    pub path: String,
    /// The raw request path ended with `/`
    pub directory_request: bool,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    #[error("Not found")]
    NotFound,
    #[error("Invalid port")]
    InvalidPort(String),
}

pub fn parse_preview_path(path: &str) -> Result<PreviewRequest, RouteError> {
    let rest = path
        .strip_prefix(PREVIEW_PREFIX)
        .ok_or(RouteError::NotFound)?;
    let (project_id, remainder) = rest.split_once('/').unwrap_or((rest, ""));
    if project_id.is_empty() {
        return Err(RouteError::NotFound);
    }

    let segments: Vec<&str> = remainder.split('/').filter(|s| !s.is_empty()).collect();

    let (port, segments) = match segments.as_slice() {
        [PORT_SEGMENT, port, rest @ ..] => (Some(parse_port(port)?), rest),
        all => (None, all),
    };

    Ok(PreviewRequest {
        project_id: project_id.to_string(),
        port,
        path: segments.join("/"),
        directory_request: path.ends_with('/'),
    })
}

fn parse_port(raw: &str) -> Result<u16, RouteError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RouteError::InvalidPort(raw.to_string()));
    }
    match raw.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(RouteError::InvalidPort(raw.to_string())),
    }
}
