//! Text extraction for ingestion inputs.

use std::path::Path;

use crate::types::RagError;

/// Extracts the text of a document at `path`.
///
/// PDF inputs go through [`extract_pdf_text`]; everything else is read as
/// bytes and decoded lossily, so undecodable sequences are replaced instead
/// of failing the file.
pub async fn load_text(path: &Path) -> Result<String, RagError> {
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        return extract_pdf_text(path);
    }
    let bytes = tokio::fs::read(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Concatenates the extracted text of every page, joined with newlines.
///
/// A page yielding no text contributes an empty string rather than an error;
/// only a document that cannot be opened at all fails.
pub fn extract_pdf_text(path: &Path) -> Result<String, RagError> {
    let document = lopdf::Document::load(path)
        .map_err(|err| RagError::InvalidDocument(format!("{}: {err}", path.display())))?;

    let pages: Vec<String> = document
        .get_pages()
        .keys()
        .map(|&page_number| document.extract_text(&[page_number]).unwrap_or_default())
        .collect();

    Ok(pages.join("\n"))
}
