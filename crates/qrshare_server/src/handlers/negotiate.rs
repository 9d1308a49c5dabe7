//! `Accept` header negotiation for the public share path.

/// Media ranges that select the browser redirect. `text/*` covers `text/html`.
const HTML_TYPES: [&str; 3] = ["text/html", "application/xhtml+xml", "text/*"];

struct MediaRange<'a> {
    essence: &'a str,
    quality: f32,
}

fn parse_quality(params: &str) -> f32 {
    params
        .split(';')
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("q"))
        .and_then(|(_, value)| value.trim().parse::<f32>().ok())
        .map(|q| q.clamp(0.0, 1.0))
        .unwrap_or(1.0)
}

fn media_ranges(accept: &str) -> impl Iterator<Item = MediaRange<'_>> {
    accept.split(',').filter_map(|item| {
        let item = item.trim();
        if item.is_empty() {
            return None;
        }
        let (essence, params) = item.split_once(';').unwrap_or((item, ""));
        Some(MediaRange {
            essence: essence.trim(),
            quality: parse_quality(params),
        })
    })
}

/// Whether `/s/{id}` should redirect to the web app instead of serving bytes.
///
/// A requester wants the redirect when it accepts HTML (directly or through
/// `text/*`), or when it states no usable preference at all: no header, an
/// empty header, or nothing but `*/*`. Ranges with `q=0` are ignored.
pub fn wants_html(accept: Option<&str>) -> bool {
    let Some(accept) = accept else {
        return true;
    };

    let mut saw_specific = false;
    for range in media_ranges(accept).filter(|range| range.quality > 0.0) {
        if HTML_TYPES
            .iter()
            .any(|html| range.essence.eq_ignore_ascii_case(html))
        {
            return true;
        }
        if range.essence != "*/*" {
            saw_specific = true;
        }
    }
    !saw_specific
}

#[cfg(test)]
mod tests {
    use super::wants_html;

    #[test]
    fn missing_or_empty_accept_redirects() {
        assert!(wants_html(None));
        assert!(wants_html(Some("")));
        assert!(wants_html(Some("  ")));
    }

    #[test]
    fn wildcard_only_redirects() {
        assert!(wants_html(Some("*/*")));
        assert!(wants_html(Some("*/*;q=0.8")));
    }

    #[test]
    fn browser_accept_headers_redirect() {
        assert!(wants_html(Some(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
        )));
        assert!(wants_html(Some("application/xhtml+xml")));
        assert!(wants_html(Some("TEXT/HTML; charset=utf-8")));
    }

    #[test]
    fn text_wildcard_counts_as_html() {
        assert!(wants_html(Some("text/*")));
        assert!(wants_html(Some("image/png, text/*;q=0.5")));
        assert!(!wants_html(Some("text/*;q=0, image/png")));
    }

    #[test]
    fn image_requests_get_bytes() {
        assert!(!wants_html(Some("image/png")));
        assert!(!wants_html(Some("image/*, */*;q=0.1")));
        assert!(!wants_html(Some("application/octet-stream")));
    }

    #[test]
    fn html_with_zero_quality_is_ignored() {
        assert!(!wants_html(Some("text/html;q=0, image/png")));
        assert!(wants_html(Some("text/html;q=0.1, image/png")));
    }
}
