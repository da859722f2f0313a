#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use receipt_mailer::CliConfig;
use std::path::Path;

pub const TWO_FIELD_LAYOUT: &str = r#"{
    "fields": {
        "name": {"x_pct": 0.1, "y_pct": 0.1},
        "amount": {"x_pct": 0.1, "y_pct": 0.2}
    }
}"#;

pub const RECEIPT_CONFIG: &str = r#"{
    "from_name": "Student Council",
    "from_email": "council@example.org",
    "from_title": "Treasurer",
    "semester": "Spring 2026",
    "email_subject": "Official Receipt {receipt_number}"
}"#;

pub const EMAIL_BODY: &str =
    "Dear {student_first_name},\n\nThank you for your contribution of {amount}.\n\n{from_name}\n{from_title}\n";

/// A letter-sized one-page PDF with a heading, standing in for the receipt template.
pub fn template_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 20.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(b"RECEIPT".to_vec(), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Writes a complete set of inputs under `dir` and returns matching CLI settings.
pub fn fixture(dir: &Path, students_csv: &str, positions: &str) -> CliConfig {
    let excel = dir.join("students.csv");
    let template = dir.join("Receipt Template.pdf");
    let config = dir.join("receipt_config.json");
    let positions_path = dir.join("template_positions.json");
    let body = dir.join("email_template.txt");
    let output = dir.join("receipts");

    std::fs::write(&excel, students_csv).unwrap();
    std::fs::write(&template, template_pdf()).unwrap();
    std::fs::write(&config, RECEIPT_CONFIG).unwrap();
    std::fs::write(&positions_path, positions).unwrap();
    std::fs::write(&body, EMAIL_BODY).unwrap();

    CliConfig {
        excel: excel.display().to_string(),
        template: template.display().to_string(),
        output: output.display().to_string(),
        config: config.display().to_string(),
        positions: positions_path.display().to_string(),
        email_template: body.display().to_string(),
        send: false,
        verbose: false,
        log_json: false,
    }
}

pub fn output_files(config: &CliConfig) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(&config.output)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

/// Decoded text operands drawn on the first page of `pdf`.
pub fn drawn_text(pdf: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(pdf).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
    content
        .operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| op.operands.first())
        .filter_map(|operand| operand.as_str().ok())
        .map(|bytes| String::from_utf8_lossy(bytes).to_string())
        .collect()
}
