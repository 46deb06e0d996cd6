use std::fs;
use std::path::Path;

use dimscan::Config;
use lopdf::{Document, Object, Stream, dictionary};
use serde_json::Value;

/// Writes a one-page US letter PDF with Helvetica as /F1 around `content`.
fn write_pdf(path: &Path, content: &str) {
    let mut doc = Document::with_version("1.7");
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ],
        "Contents" => Object::Reference(content_id),
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => Object::Reference(font_id) },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize pdf");
    fs::write(path, bytes).expect("write pdf");
}

const DRAWING: &str = "\
BT /F1 10 Tf 72 740 Td (DESCRIZIONE FLANGIA DI ACCOPPIAMENTO LAVORAZIONE DI PRECISIONE) Tj ET
BT /F1 10 Tf 72 725 Td (MATERIALE ACCIAIO INOX TRATTAMENTO SUPERFICIALE SABBIATURA) Tj ET
BT /F1 10 Tf 100 600 Td (25 foro) Tj ET
BT /F1 10 Tf 300 400 Td (12/03/2024) Tj ET
q 0 1 -1 0 500 300 cm BT /F1 10 Tf 0 0 Td (40) Tj ET Q";

fn scan(path: &Path, page: u32) -> anyhow::Result<Value> {
    let settings = path.with_file_name("settings.toml");
    fs::write(&settings, "").expect("write settings");
    let output = dimscan::run(Config {
        input: Some(path.to_path_buf()),
        page,
        settings_path: Some(settings.display().to_string()),
        ..Config::default()
    })?;
    Ok(serde_json::from_str(&output).expect("json output"))
}

fn token<'a>(value: &'a Value, text: &str) -> Option<&'a Value> {
    value["tokens"]
        .as_array()
        .and_then(|tokens| tokens.iter().find(|t| t["text"] == text))
}

#[test]
fn textual_pdf_is_read_from_its_text_layer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("drawing.pdf");
    write_pdf(&path, DRAWING);

    let value = scan(&path, 0).expect("scan");
    assert_eq!(value["pdf_kind"], "textual");
    assert_eq!(value["page"], 0);

    let number = token(&value, "25").expect("upright number");
    assert_eq!(number["type"], "number");
    assert_eq!(number["source"], "pdfplumber");
    assert_eq!(number["confidence"], 100);
    assert_eq!(token(&value, "12/03/2024").expect("date")["type"], "date");
    assert_eq!(
        token(&value, "40").expect("sideways number")["type"],
        "number"
    );

    let total = value["tokens"].as_array().map_or(0, Vec::len);
    assert_eq!(value["total"], total);
}

#[test]
fn pdf_without_text_or_images_counts_as_hybrid() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("blank.pdf");
    write_pdf(&path, "");

    let value = scan(&path, 0).expect("scan");
    assert_eq!(value["pdf_kind"], "hybrid");
    assert_eq!(value["total"], 0);
}

#[test]
fn missing_page_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("drawing.pdf");
    write_pdf(&path, DRAWING);

    let err = scan(&path, 3).expect_err("page out of range");
    assert!(err.to_string().contains("pdf has no page 3"));
}
