/// Validates a `return_to` URL to prevent open redirects.
///
/// Returns `Some(url)` only for plain relative paths. Protocol-relative
/// URLs (`//evil.com`), absolute URLs with a scheme, and anything carrying
/// control characters are rejected.
///
/// # Examples
///
/// ```
/// use questline_core::auth::validate_return_to;
///
/// assert_eq!(validate_return_to("/quests/123"), Some("/quests/123"));
/// assert_eq!(validate_return_to("/"), Some("/"));
/// assert_eq!(validate_return_to("//evil.com"), None);
/// assert_eq!(validate_return_to("https://evil.com"), None);
/// ```
pub fn validate_return_to(url: &str) -> Option<&str> {
    if !url.starts_with('/') {
        return None;
    }

    if url.starts_with("//") {
        return None;
    }

    if url.chars().any(|c| c.is_control()) {
        return None;
    }

    if url.contains("://") {
        return None;
    }

    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_relative_paths() {
        assert_eq!(validate_return_to("/quests"), Some("/quests"));
        assert_eq!(
            validate_return_to("/quests?tab=active"),
            Some("/quests?tab=active")
        );
    }

    #[test]
    fn rejects_protocol_relative_and_absolute_urls() {
        assert_eq!(validate_return_to("//evil.com"), None);
        assert_eq!(validate_return_to("https://evil.com/quests"), None);
        assert_eq!(validate_return_to("javascript://alert"), None);
    }

    #[test]
    fn rejects_control_characters_and_bare_words() {
        assert_eq!(validate_return_to("/que\nsts"), None);
        assert_eq!(validate_return_to("quests"), None);
        assert_eq!(validate_return_to(""), None);
    }
}
