use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};
use tempfile::TempDir;

use docstore_core::Error;
use docstore_extract::{DocumentFormat, FormatReader};

fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("write fixture");
    path
}

fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().expect("encode content")));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save pdf");
    out
}

fn docx_bytes(body: &str) -> Vec<u8> {
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    zip.start_file("[Content_Types].xml", options).expect("start");
    zip.write_all(b"<Types/>").expect("write");
    zip.start_file("word/document.xml", options).expect("start");
    zip.write_all(xml.as_bytes()).expect("write");
    zip.finish().expect("finish").into_inner()
}

#[test]
fn json_array_yields_one_unit_per_element() {
    let tmp = TempDir::new().expect("tmp");
    let path = write(
        tmp.path(),
        "feed.json",
        br#"[{"text": "a", "title": "First"}, {"text": "b", "date": "2024-01-02"}]"#,
    );
    let doc = FormatReader::new().read(&path).expect("read");
    assert_eq!(doc.texts(), vec!["a", "b"]);
    assert_eq!(doc.units[0].fields["title"], "First");
    assert_eq!(doc.units[1].fields["date"], "2024-01-02");
    assert_eq!(doc.source.file_name, "feed.json");
    assert_eq!(doc.source.format, "json");
}

#[test]
fn pdf_pages_are_joined_into_one_unit() {
    let tmp = TempDir::new().expect("tmp");
    let path = write(tmp.path(), "report.pdf", &pdf_bytes(&["alpha", "bravo", "charlie"]));
    let doc = FormatReader::new().read(&path).expect("read");
    assert_eq!(doc.units.len(), 1);
    assert_eq!(doc.units[0].text, "alpha bravo charlie");
    assert_eq!(doc.units[0].fields["total_pages"], 3);
}

#[test]
fn pdf_page_without_text_contributes_an_empty_string() {
    let tmp = TempDir::new().expect("tmp");
    let path = write(tmp.path(), "gap.pdf", &pdf_bytes(&["alpha", "", "charlie"]));
    let doc = FormatReader::new().read(&path).expect("read");
    assert_eq!(doc.units.len(), 1);
    assert_eq!(doc.units[0].text, "alpha  charlie");
    assert_eq!(doc.units[0].fields["total_pages"], 3);
}

#[test]
fn docx_text_box_does_not_swallow_the_surrounding_paragraph() {
    let tmp = TempDir::new().expect("tmp");
    let body = "<w:p><w:r><w:t>Before the box,</w:t></w:r>\
                <w:r><w:pict><w:txbxContent><w:p><w:r><w:t>Boxed note.</w:t></w:r></w:p></w:txbxContent></w:pict></w:r>\
                <w:r><w:t xml:space=\"preserve\"> after the box.</w:t></w:r></w:p>";
    let path = write(tmp.path(), "boxed.docx", &docx_bytes(body));
    let doc = FormatReader::new().read(&path).expect("read");
    assert_eq!(doc.units[0].text, "Before the box, after the box. Boxed note.");
    assert_eq!(doc.units[0].fields["paragraphs"], 2);
}

#[test]
fn docx_paragraphs_skip_blank_ones() {
    let tmp = TempDir::new().expect("tmp");
    let body = "<w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p>\
                <w:p></w:p>\
                <w:p><w:r><w:t>Second</w:t></w:r><w:r><w:t xml:space=\"preserve\"> one.</w:t></w:r></w:p>";
    let path = write(tmp.path(), "memo.docx", &docx_bytes(body));
    let doc = FormatReader::new().read(&path).expect("read");
    assert_eq!(doc.units.len(), 1);
    assert_eq!(doc.units[0].text, "First paragraph. Second one.");
    assert_eq!(doc.units[0].fields["paragraphs"], 2);
}

#[test]
fn txt_is_returned_unmodified() {
    let tmp = TempDir::new().expect("tmp");
    let raw = "  line one\n\nline two\t\n";
    let path = write(tmp.path(), "notes.TXT", raw.as_bytes());
    assert_eq!(FormatReader::new().read_texts(&path).expect("read"), vec![raw]);
}

#[test]
fn every_supported_format_yields_at_least_one_unit() {
    let tmp = TempDir::new().expect("tmp");
    for format in DocumentFormat::ALL {
        let path = match format {
            DocumentFormat::Json => write(tmp.path(), "a.json", br#"{"text": "x"}"#),
            DocumentFormat::Pdf => write(tmp.path(), "a.pdf", &pdf_bytes(&["x"])),
            DocumentFormat::Docx => write(tmp.path(), "a.docx", &docx_bytes("<w:p><w:r><w:t>x</w:t></w:r></w:p>")),
            DocumentFormat::Txt => write(tmp.path(), "a.txt", b""),
        };
        let doc = FormatReader::new().read(&path).expect("read");
        assert!(!doc.units.is_empty(), "{} produced no units", format.as_str());
    }
}

#[test]
fn unsupported_extension_is_rejected() {
    let tmp = TempDir::new().expect("tmp");
    let path = write(tmp.path(), "slides.pptx", b"PK");
    assert!(matches!(FormatReader::new().read(&path), Err(Error::UnsupportedFormat(_))));
}

#[test]
fn missing_file_is_not_found() {
    let tmp = TempDir::new().expect("tmp");
    let err = FormatReader::new().read(&tmp.path().join("nope.pdf")).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn mislabeled_pdf_is_an_extraction_error() {
    let tmp = TempDir::new().expect("tmp");
    let path = write(tmp.path(), "fake.pdf", b"just text");
    assert!(matches!(FormatReader::new().read(&path), Err(Error::Extraction { .. })));
}
