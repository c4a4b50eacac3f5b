//! Text processing utilities.

/// Minimum non-whitespace characters for a chunk worth indexing.
pub const MIN_CHUNK_CONTENT: usize = 10;

/// Check if a chunk has enough substance to be worth embedding.
pub fn has_meaningful_content(content: &str) -> bool {
    content.chars().filter(|c| !c.is_whitespace()).count() >= MIN_CHUNK_CONTENT
}

/// Truncate a snippet for display, on a char boundary.
pub fn truncate_snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}...", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_meaningful_content() {
        assert!(!has_meaningful_content(""));
        assert!(!has_meaningful_content("   \n\n   "));
        assert!(!has_meaningful_content("a b"));
        assert!(has_meaningful_content("Refunds are issued within 30 days."));
    }

    #[test]
    fn test_truncate_snippet() {
        assert_eq!(truncate_snippet("short", 10), "short");
        assert_eq!(truncate_snippet("abcdefghij", 4), "abcd...");
    }
}
