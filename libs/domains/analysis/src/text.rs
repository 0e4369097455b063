//! Plain-text preparation of uploads for synchronous summaries

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{AnalysisError, AnalysisResult};

/// Content types decoded as UTF-8 text; parameters such as `charset` are ignored
pub fn is_text_content(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence.starts_with("text/") || essence == "application/json" || essence == "application/xml"
}

/// Decode a text upload and strip page furniture.
///
/// Fails with [`AnalysisError::Validation`] for non-text content types,
/// invalid UTF-8 and uploads with no text left after cleaning.
pub fn extract_text(content_type: &str, bytes: Vec<u8>) -> AnalysisResult<String> {
    if !is_text_content(content_type) {
        return Err(AnalysisError::Validation(format!(
            "cannot summarize {content_type} uploads, only text content"
        )));
    }

    let raw = String::from_utf8(bytes)
        .map_err(|e| AnalysisError::Validation(format!("upload is not valid UTF-8: {e}")))?;
    let text = clean_text(&raw);
    if text.is_empty() {
        return Err(AnalysisError::Validation("upload contains no text".to_string()));
    }
    Ok(text)
}

static PAGE_HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*Page \d+.*$").unwrap());
static CONFIDENTIAL_BANNER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*CONFIDENTIAL.*$").unwrap());
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

/// Blank out page headers and confidentiality banners, collapse whitespace
/// runs into a single space and trim.
pub fn clean_text(raw: &str) -> String {
    let text = PAGE_HEADER.replace_all(raw, "");
    let text = CONFIDENTIAL_BANNER.replace_all(&text, "");
    WHITESPACE_RUN.replace_all(&text, " ").trim().to_string()
}
