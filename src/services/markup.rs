use crate::error::{AppError, Result};

/// Lenient well-formedness check for replacement HTML.
///
/// The html5ever tokenizer behind `html2text` recovers from unclosed or
/// misnested tags, so those pass. What is rejected: non-UTF-8 bodies, blank
/// bodies, and bodies that do not open with markup.
pub fn check_markup(body: &[u8]) -> Result<&str> {
    let html = std::str::from_utf8(body)
        .map_err(|e| AppError::invalid(format!("HTML is not valid UTF-8: {}", e)))?;

    let trimmed = html.trim_start_matches('\u{feff}').trim_start();
    if trimmed.is_empty() {
        return Err(AppError::invalid("HTML body is empty"));
    }
    if !trimmed.starts_with('<') {
        return Err(AppError::invalid("HTML seems to be invalid: body does not start with markup"));
    }

    // Parse into a render tree only; laying it out at a fixed width would
    // reject deeply nested but well-formed documents.
    if let Err(e) = html2text::parse(html.as_bytes()) {
        tracing::debug!("Rejected HTML: {}", e);
        return Err(AppError::invalid(format!("HTML seems to be invalid: {}", e)));
    }
    Ok(html)
}
