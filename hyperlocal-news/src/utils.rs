/// Canonical form of an area name: lowercase, trimmed, internal whitespace
/// runs collapsed to one space.
pub fn normalize_area_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text processing utilities
pub mod text {
    /// Lowercase, strip punctuation other than basic separators, collapse whitespace.
    pub fn normalize_text(text: &str) -> String {
        text.to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace() || "-'".contains(*c))
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// URL-safe slug: ASCII alphanumerics joined by single dashes.
    pub fn slugify(text: &str) -> String {
        text.to_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Shorten text for log lines without splitting a UTF-8 character.
    pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

/// URL utilities
pub mod url {
    use url::Url;

    /// Mask the password component of a connection string for logging.
    pub fn mask_password(url_str: &str) -> String {
        match Url::parse(url_str) {
            Ok(mut url) if url.password().is_some() => {
                let _ = url.set_password(Some("***"));
                url.to_string()
            }
            _ => url_str.to_string(),
        }
    }
}
