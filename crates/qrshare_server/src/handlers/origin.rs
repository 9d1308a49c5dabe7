//! Public origin resolution for share URLs.

use axum::http::{header, HeaderMap};
use qrshare_core::SHARE_PATH_PREFIX;

const FORWARDED_PROTO: &str = "x-forwarded-proto";
const FALLBACK_ORIGIN: &str = "http://localhost";

fn header_str<'a>(headers: &'a HeaderMap, name: impl header::AsHeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Origin (`scheme://host[:port]`) that share URLs are built on.
///
/// A configured `PUBLIC_URL` always wins. Otherwise the `Host` header is used
/// with the scheme from `X-Forwarded-Proto` (only `http`/`https` honoured).
pub fn request_origin(public_url: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(public_url) = public_url {
        return public_url.to_string();
    }

    let Some(host) = header_str(headers, header::HOST) else {
        return FALLBACK_ORIGIN.to_string();
    };
    let scheme = header_str(headers, FORWARDED_PROTO)
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| value == "http" || value == "https")
        .unwrap_or_else(|| "http".to_string());
    format!("{}://{}", scheme, host)
}

/// `<origin>/s/<id>`.
pub fn share_url(origin: &str, id: &str) -> String {
    format!("{}{}{}", origin, SHARE_PATH_PREFIX, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn configured_public_url_wins() {
        let map = headers(&[("host", "internal:8080")]);
        assert_eq!(
            request_origin(Some("https://qr.example.com"), &map),
            "https://qr.example.com"
        );
    }

    #[test]
    fn host_header_defaults_to_http() {
        let map = headers(&[("host", "127.0.0.1:38420")]);
        assert_eq!(request_origin(None, &map), "http://127.0.0.1:38420");
    }

    #[test]
    fn forwarded_proto_selects_scheme() {
        let map = headers(&[("host", "qr.example.com"), ("x-forwarded-proto", "HTTPS, http")]);
        assert_eq!(request_origin(None, &map), "https://qr.example.com");

        let bogus = headers(&[("host", "qr.example.com"), ("x-forwarded-proto", "gopher")]);
        assert_eq!(request_origin(None, &bogus), "http://qr.example.com");
    }

    #[test]
    fn missing_host_falls_back_to_localhost() {
        assert_eq!(request_origin(None, &HeaderMap::new()), "http://localhost");
    }

    #[test]
    fn share_url_joins_origin_and_id() {
        assert_eq!(
            share_url("https://qr.example.com", "0123abcd"),
            "https://qr.example.com/s/0123abcd"
        );
    }
}
