//! Candidate upstream URLs for one preview request.
//!
//! Sandboxes serve static files, so a directory-style request may be answered at
//! `{path}/index.html` or directly at `{path}`. Both are tried, most likely first.

const INDEX_DOCUMENT: &str = "index.html";

/// Replaces the `{port}-` label that sandbox providers put at the start of the
/// host (`https://8080-abc123.proxy.example.works`). Any other URL is returned
/// unchanged.
pub fn rewrite_port(sandbox_url: &str, port: u16) -> String {
    let Some((scheme, rest)) = sandbox_url.split_once("://") else {
        tracing::warn!(sandbox_url, port, "Sandbox URL has no scheme, port not applied");
        return sandbox_url.to_string();
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || rest.as_bytes().get(digits) != Some(&b'-') {
        tracing::warn!(sandbox_url, port, "Sandbox URL has no port label, port not applied");
        return sandbox_url.to_string();
    }

    format!("{scheme}://{port}-{}", &rest[digits + 1..])
}

/// Builds the ordered, de-duplicated list of URLs to try.
///
/// `query` is appended verbatim to every candidate.
pub fn build_candidates(
    base_url: &str,
    path: &str,
    directory_request: bool,
    query: Option<&str>,
) -> Vec<String> {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_matches('/');

    let mut paths: Vec<String> = Vec::with_capacity(3);
    if path.is_empty() || directory_request {
        paths.push(match path {
            "" => INDEX_DOCUMENT.to_string(),
            p => format!("{p}/{INDEX_DOCUMENT}"),
        });
    }
    paths.push(path.to_string());

    let mut seen = Vec::with_capacity(paths.len());
    for p in paths {
        if !seen.contains(&p) {
            seen.push(p);
        }
    }

    let suffix = match query {
        Some(q) if !q.is_empty() => format!("?{q}"),
        _ => String::new(),
    };

    seen.iter()
        .map(|p| format!("{base}/{p}{suffix}"))
        .collect()
}
