mod common;

use std::fs;

use onenote_export::{ExportFormat, ExportOptions, convert_page};

fn assert_pdf(bytes: &[u8]) {
    assert!(bytes.starts_with(b"%PDF"), "missing PDF header");
    assert!(bytes.len() > 500);
}

#[cfg(test)]
mod pdf_export_tests {
    use super::*;

    #[test]
    fn test_pdf_written_for_sample_page() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("notes.pdf");

        assert!(convert_page(
            &common::sample_page("Weekly notes", 4),
            "Weekly notes",
            ExportFormat::Pdf,
            &output,
            &ExportOptions::default()
        ));
        assert_pdf(&fs::read(&output).expect("pdf written"));
    }

    #[test]
    fn test_wide_and_long_tables_are_paginated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("tables.pdf");
        let markup = format!(
            "<Page>{}{}</Page>",
            common::table_markup(20, 5),
            common::table_markup(3, 200)
        );

        assert!(convert_page(
            &markup,
            "Tables",
            ExportFormat::Pdf,
            &output,
            &ExportOptions::default()
        ));
        assert_pdf(&fs::read(&output).expect("pdf written"));
    }

    #[test]
    fn test_missing_configured_font_still_exports() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("fallback.pdf");
        let options = ExportOptions {
            pdf_font: Some(dir.path().join("missing.ttf")),
            ..ExportOptions::default()
        };

        assert!(convert_page(
            "<Page><T>Plain text only</T></Page>",
            "Fallback",
            ExportFormat::Pdf,
            &output,
            &options
        ));
        assert_pdf(&fs::read(&output).expect("pdf written"));
    }

    #[test]
    fn test_unwritable_output_fails_the_page() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("missing-dir").join("out.pdf");

        assert!(!convert_page(
            "<Page><T>text</T></Page>",
            "Unwritable",
            ExportFormat::Pdf,
            &output,
            &ExportOptions::default()
        ));
        assert!(!output.exists());
    }
}
