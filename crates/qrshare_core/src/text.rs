//! Shared text normalization helpers.

/// Trim an optional string and drop empty values.
///
/// # Returns
/// `None` when the input is missing or whitespace-only; otherwise the trimmed
/// string.
pub fn normalize_optional_nonempty(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Normalize the user-visible share text.
///
/// Missing and whitespace-only text both become the empty string, which makes
/// the identity function fall back to the raster payload.
pub fn normalize_share_text(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_nonempty_trims_and_drops_blank() {
        assert_eq!(
            normalize_optional_nonempty(Some("  abc ".to_string())),
            Some("abc".to_string())
        );
        assert_eq!(normalize_optional_nonempty(Some(" \t\n".to_string())), None);
        assert_eq!(normalize_optional_nonempty(None), None);
    }

    #[test]
    fn share_text_is_trimmed_and_blank_collapses_to_empty() {
        assert_eq!(normalize_share_text(Some("  hello\n")), "hello");
        assert_eq!(normalize_share_text(Some("   ")), "");
        assert_eq!(normalize_share_text(None), "");
        assert_eq!(normalize_share_text(Some("a  b")), "a  b");
    }
}
