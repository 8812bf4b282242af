pub mod arxiv;
pub mod ieee;
pub mod traits;

pub use arxiv::ArxivProvider;
pub use ieee::IeeeProvider;
pub use traits::{
    ProviderError, SearchField, SearchRequest, SearchResponse, SortBy, SortOrder, SourceProvider,
    MAX_RESULTS_LIMIT,
};

/// Collapse every whitespace run to a single space and trim
pub(crate) fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trimmed body preview for error messages
pub(crate) fn body_preview(body: &str) -> String {
    const LIMIT: usize = 200;
    let mut preview: String = body.chars().take(LIMIT).collect();
    if preview.len() < body.len() {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(
            clean_text("  Attention\n   Is All\tYou Need \n"),
            "Attention Is All You Need"
        );
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_body_preview_truncates() {
        let long = "x".repeat(500);
        assert_eq!(body_preview(&long).len(), 203);
        assert_eq!(body_preview("short"), "short");
    }
}
