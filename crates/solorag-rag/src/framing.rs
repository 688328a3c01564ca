//! Streaming response framing.
//!
//! A streamed answer is the concatenated answer chunks followed by exactly
//! one trailer chunk:
//!
//! ```text
//! <answer text ...>\n\n[SOURCES] [{"text":"...","score":1.5}, ...]
//! ```
//!
//! The delimiter is a plain substring. Answer text that itself contains the
//! delimiter would be ambiguous, so [`split_sources_trailer`] splits at the
//! last occurrence, which is always the real trailer when one was sent.

use solorag_core::{Error, Result, ScoredPassage};

/// Separates answer text from the JSON sources list.
pub const SOURCES_DELIMITER: &str = "\n\n[SOURCES] ";

/// The bare marker inside [`SOURCES_DELIMITER`].
pub const SOURCES_MARKER: &str = "[SOURCES]";

/// Render the trailer chunk for `sources`.
pub fn sources_trailer(sources: &[ScoredPassage]) -> Result<String> {
    Ok(format!("{SOURCES_DELIMITER}{}", serde_json::to_string(sources)?))
}

/// Split a complete streamed body into answer text and sources.
///
/// Returns `Ok(None)` if no trailer is present, which is what a consumer
/// sees when the stream failed before completing.
pub fn split_sources_trailer(body: &str) -> Result<Option<(&str, Vec<ScoredPassage>)>> {
    let Some(at) = body.rfind(SOURCES_DELIMITER) else {
        return Ok(None);
    };
    let (answer, rest) = body.split_at(at);
    let json = &rest[SOURCES_DELIMITER.len()..];
    let sources: Vec<ScoredPassage> = serde_json::from_str(json)
        .map_err(|e| Error::invalid_data(format!("malformed sources trailer: {e}")))?;
    Ok(Some((answer, sources)))
}
