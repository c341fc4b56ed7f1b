use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use http::HeaderMap;
use http::header::{AUTHORIZATION, COOKIE};
use std::collections::HashMap;
use std::fmt;

const BASE64_PREFIX: &str = "base64-";
// Browsers cap cookie size, so long sessions are split into `name.0`, `name.1`, ...
const MAX_CHUNKS: usize = 16;

/// Access token presented by the requester.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(access_token: impl Into<String>) -> Self {
        Credentials {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Reads credentials from a bearer `Authorization` header, falling back to the
    /// session cookie when one is configured.
    pub fn from_headers(headers: &HeaderMap, session_cookie: Option<&str>) -> Option<Self> {
        if let Some(token) = bearer_token(headers) {
            return Some(Credentials::new(token));
        }

        let cookie_name = session_cookie?;
        let cookies = parse_cookies(headers);
        let raw = joined_cookie_value(&cookies, cookie_name)?;
        decode_session_value(&raw).map(Credentials::new)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token.to_string())
    } else {
        None
    }
}

fn parse_cookies(headers: &HeaderMap) -> HashMap<&str, &str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim(), value.trim().trim_matches('"')))
        .collect()
}

fn joined_cookie_value(cookies: &HashMap<&str, &str>, name: &str) -> Option<String> {
    if let Some(value) = cookies.get(name) {
        return Some(value.to_string());
    }

    let mut joined = String::new();
    for idx in 0..MAX_CHUNKS {
        match cookies.get(format!("{name}.{idx}").as_str()) {
            Some(chunk) => joined.push_str(chunk),
            None => break,
        }
    }

    (!joined.is_empty()).then_some(joined)
}

/// Extracts the access token from a session cookie value. Accepts a `base64-`
/// prefixed payload, URL-encoded JSON, a JSON object with `access_token`, a JSON
/// array whose first element is the token, or the bare token.
fn decode_session_value(raw: &str) -> Option<String> {
    let decoded = match raw.strip_prefix(BASE64_PREFIX) {
        Some(encoded) => {
            let bytes = URL_SAFE_NO_PAD
                .decode(encoded.trim_end_matches('='))
                .or_else(|_| STANDARD.decode(encoded))
                .ok()?;
            String::from_utf8(bytes).ok()?
        }
        None => urlencoding::decode(raw).ok()?.into_owned(),
    };

    let token = match serde_json::from_str::<serde_json::Value>(&decoded) {
        Ok(serde_json::Value::Object(map)) => map.get("access_token")?.as_str()?.to_string(),
        Ok(serde_json::Value::Array(items)) => items.first()?.as_str()?.to_string(),
        Ok(serde_json::Value::String(token)) => token,
        Ok(_) => return None,
        Err(_) => decoded,
    };

    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(*name, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn test_bearer_header_wins() {
        let h = headers(&[
            ("authorization", "Bearer header-token"),
            ("cookie", "session=cookie-token"),
        ]);
        let creds = Credentials::from_headers(&h, Some("session")).unwrap();
        assert_eq!(creds.access_token(), "header-token");

        let h = headers(&[("authorization", "Basic dXNlcjpwYXNz")]);
        assert_eq!(Credentials::from_headers(&h, None), None);
    }

    #[test]
    fn test_cookie_requires_configured_name() {
        let h = headers(&[("cookie", "session=cookie-token")]);
        assert_eq!(Credentials::from_headers(&h, None), None);
        assert_eq!(Credentials::from_headers(&h, Some("other")), None);

        let creds = Credentials::from_headers(&h, Some("session")).unwrap();
        assert_eq!(creds.access_token(), "cookie-token");
    }

    #[test]
    fn test_json_and_base64_cookie_values() {
        let json = r#"{"access_token":"jwt-1","refresh_token":"r"}"#;
        let encoded = format!("base64-{}", URL_SAFE_NO_PAD.encode(json));
        let cookie = format!("theme=dark; sb-ref-auth-token={encoded}");
        let h = headers(&[("cookie", cookie.as_str())]);
        let creds = Credentials::from_headers(&h, Some("sb-ref-auth-token")).unwrap();
        assert_eq!(creds.access_token(), "jwt-1");

        let url_encoded = urlencoding::encode(r#"["jwt-2","refresh",null]"#).into_owned();
        let cookie = format!("sb-ref-auth-token={url_encoded}");
        let h = headers(&[("cookie", cookie.as_str())]);
        let creds = Credentials::from_headers(&h, Some("sb-ref-auth-token")).unwrap();
        assert_eq!(creds.access_token(), "jwt-2");
    }

    #[test]
    fn test_chunked_cookie() {
        let json = r#"{"access_token":"chunked-jwt"}"#;
        let encoded = format!("base64-{}", URL_SAFE_NO_PAD.encode(json));
        let (first, second) = encoded.split_at(10);
        let first = format!("sb-ref-auth-token.0={first}");
        let second = format!("sb-ref-auth-token.1={second}");
        let h = headers(&[("cookie", first.as_str()), ("cookie", second.as_str())]);
        let creds = Credentials::from_headers(&h, Some("sb-ref-auth-token")).unwrap();
        assert_eq!(creds.access_token(), "chunked-jwt");
    }

    #[test]
    fn test_unusable_cookie_values() {
        assert_eq!(decode_session_value(""), None);
        assert_eq!(decode_session_value("base64-!!!"), None);
        assert_eq!(decode_session_value(r#"{"refresh_token":"r"}"#), None);
        assert_eq!(decode_session_value("42"), None);
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = Credentials::new("secret");
        assert!(!format!("{creds:?}").contains("secret"));
    }
}
