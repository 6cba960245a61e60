use std::path::Path;

use lopdf::Document;
use tracing::{debug, warn};

use docstore_core::error::{Error, Result};
use docstore_core::types::TextUnit;

/// All pages become one unit, joined by a single space. A page lopdf cannot
/// pull text out of contributes an empty string.
pub fn extract(path: &Path, bytes: &[u8]) -> Result<Vec<TextUnit>> {
    if !is_pdf(bytes) {
        return Err(Error::extraction(path.display().to_string(), "missing %PDF header"));
    }
    let doc = Document::load_mem(bytes).map_err(|e| Error::extraction(path.display().to_string(), format!("failed to load PDF: {}", e)))?;
    let pages = doc.get_pages();
    let mut texts = Vec::with_capacity(pages.len());
    for &page_number in pages.keys() {
        let text = match doc.extract_text(&[page_number]) {
            Ok(t) => t.trim().to_string(),
            Err(e) => {
                warn!(path = %path.display(), page = page_number, error = %e, "no extractable text on page");
                String::new()
            }
        };
        texts.push(text);
    }
    debug!(path = %path.display(), pages = pages.len(), "pdf pages read");
    let joined = texts.join(" ").trim().to_string();
    Ok(vec![TextUnit::new(joined).with_field("total_pages", pages.len())])
}

/// Magic-byte check used to give a clearer error for mislabeled files.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}
