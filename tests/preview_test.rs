mod common;

use common::{drawn_text, fixture, output_files, TWO_FIELD_LAYOUT};
use receipt_mailer::app;
use receipt_mailer::domain::model::Stage;
use receipt_mailer::ReceiptError;
use tempfile::TempDir;

const STUDENTS: &str = "Name,Email,Amount\nA,a@example.com,25000\nB,b@example.com,5000\n";

#[tokio::test]
async fn test_preview_writes_one_receipt_per_student() {
    let dir = TempDir::new().unwrap();
    let config = fixture(dir.path(), STUDENTS, TWO_FIELD_LAYOUT);

    let summary = app::run(&config).await.unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed(), 0);
    assert_eq!(output_files(&config), vec!["A_Receipt.pdf", "B_Receipt.pdf"]);
    assert_eq!(summary.written.len(), 2);
    assert!(summary.written[0].ends_with("A_Receipt.pdf"));
    assert!(summary.written[1].ends_with("B_Receipt.pdf"));

    let pdf = std::fs::read(dir.path().join("receipts").join("A_Receipt.pdf")).unwrap();
    let text = drawn_text(&pdf);
    assert!(text.contains(&"RECEIPT".to_string()));
    assert!(text.contains(&"A".to_string()));
    assert!(text.contains(&"25,000 RWF".to_string()));
}

#[tokio::test]
async fn test_preview_is_repeatable() {
    let dir = TempDir::new().unwrap();
    let config = fixture(dir.path(), STUDENTS, TWO_FIELD_LAYOUT);
    let receipt = dir.path().join("receipts").join("B_Receipt.pdf");

    app::run(&config).await.unwrap();
    let first = std::fs::read(&receipt).unwrap();
    app::run(&config).await.unwrap();
    let second = std::fs::read(&receipt).unwrap();

    assert_eq!(drawn_text(&first), drawn_text(&second));
}

#[tokio::test]
async fn test_blank_rows_are_skipped() {
    let dir = TempDir::new().unwrap();
    let config = fixture(
        dir.path(),
        "name,email,amount\nA,a@example.com,100\n,,\nB,b@example.com,200\n",
        TWO_FIELD_LAYOUT,
    );

    let summary = app::run(&config).await.unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(output_files(&config).len(), 2);
}

#[tokio::test]
async fn test_required_field_without_position_skips_records() {
    let dir = TempDir::new().unwrap();
    let config = fixture(
        dir.path(),
        STUDENTS,
        r#"{"fields": {"name": {"x_pct": 0.1, "y_pct": 0.1}}}"#,
    );

    let summary = app::run(&config).await.unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.succeeded, 0);
    assert!(summary.failures.iter().all(|f| f.stage == Stage::Map));
    assert_eq!(summary.failures[1].recipient, "b@example.com");
    assert!(output_files(&config).is_empty());
}

#[tokio::test]
async fn test_missing_required_column_is_setup_error() {
    let dir = TempDir::new().unwrap();
    let config = fixture(dir.path(), "name,amount\nA,100\n", TWO_FIELD_LAYOUT);

    let err = app::run(&config).await.unwrap_err();

    assert!(matches!(err, ReceiptError::FileError { .. }));
    assert!(err.to_string().contains("email"));
}

#[tokio::test]
async fn test_out_of_range_position_is_setup_error() {
    let dir = TempDir::new().unwrap();
    let config = fixture(
        dir.path(),
        STUDENTS,
        r#"{"fields": {"name": {"x_pct": 0.1, "y_pct": 1.2}, "amount": {"x_pct": 0.1, "y_pct": 0.2}}}"#,
    );

    let err = app::run(&config).await.unwrap_err();
    assert!(err.to_string().contains("y_pct"));
}
