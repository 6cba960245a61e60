use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use docstore_core::error::{Error, Result};
use docstore_core::types::TextUnit;

const DOCUMENT_PART: &str = "word/document.xml";

/// Non-blank paragraphs of the main document part, space-joined into one unit.
pub fn extract(path: &Path, bytes: &[u8]) -> Result<Vec<TextUnit>> {
    let fail = |reason: String| Error::extraction(path.display().to_string(), reason);
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| fail(format!("not a DOCX archive: {}", e)))?;
    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| fail(format!("{} missing: {}", DOCUMENT_PART, e)))?
        .read_to_string(&mut xml)
        .map_err(|e| fail(format!("{} unreadable: {}", DOCUMENT_PART, e)))?;

    let paragraphs: Vec<String> = paragraphs(&xml)
        .map_err(fail)?
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect();
    let count = paragraphs.len();
    Ok(vec![TextUnit::new(paragraphs.join(" ")).with_field("paragraphs", count)])
}

/// Text of every `<w:p>` in the order the paragraphs open. Runs are
/// concatenated; tabs and breaks keep their whitespace. A paragraph nested in
/// another (text boxes) is its own entry and leaves the outer text intact.
pub fn paragraphs(xml: &str) -> std::result::Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut out: Vec<String> = Vec::new();
    // Slot in `out` and accumulated text of each open paragraph, innermost last.
    let mut open: Vec<(usize, String)> = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => {
                    open.push((out.len(), String::new()));
                    out.push(String::new());
                }
                b"w:t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:p" => out.push(String::new()),
                b"w:tab" => push_text(&mut open, "\t"),
                b"w:br" | b"w:cr" => push_text(&mut open, "\n"),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| format!("bad text in document.xml: {}", e))?;
                push_text(&mut open, &text);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    if let Some((slot, text)) = open.pop() {
                        out[slot] = text;
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("malformed document.xml at {}: {}", reader.buffer_position(), e)),
            Ok(_) => {}
        }
    }
    Ok(out)
}

/// Text outside any paragraph is dropped.
fn push_text(open: &mut [(usize, String)], text: &str) {
    if let Some((_, current)) = open.last_mut() {
        current.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_join_within_a_paragraph() {
        let xml = r#"<w:document xmlns:w="x"><w:body>
            <w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space="preserve"> world</w:t></w:r></w:p>
            <w:p/>
            <w:p><w:r><w:t>A &amp; B</w:t></w:r></w:p>
        </w:body></w:document>"#;
        assert_eq!(paragraphs(xml).expect("parse"), vec!["Hello world", "", "A & B"]);
    }

    #[test]
    fn text_box_paragraph_keeps_the_outer_text() {
        let xml = r#"<w:body><w:p><w:r><w:t>Outer</w:t></w:r><w:r><w:pict><w:txbxContent><w:p><w:r><w:t>Inner</w:t></w:r></w:p></w:txbxContent></w:pict></w:r><w:r><w:t xml:space="preserve"> tail</w:t></w:r></w:p></w:body>"#;
        assert_eq!(paragraphs(xml).expect("parse"), vec!["Outer tail", "Inner"]);
    }

    #[test]
    fn non_zip_bytes_are_an_extraction_error() {
        let err = extract(Path::new("x.docx"), b"plain text").unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
    }
}
