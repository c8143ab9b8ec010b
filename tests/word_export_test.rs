mod common;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use onenote_export::{ExportFormat, ExportOptions, convert_page};

fn read_entry(path: &Path, name: &str) -> String {
    let mut archive = zip::ZipArchive::new(File::open(path).expect("open docx")).expect("zip");
    let mut entry = archive.by_name(name).expect("entry present");
    let mut content = String::new();
    entry.read_to_string(&mut content).expect("utf-8 entry");
    content
}

fn media_entries(path: &Path) -> usize {
    let archive = zip::ZipArchive::new(File::open(path).expect("open docx")).expect("zip");
    archive
        .file_names()
        .filter(|name| name.starts_with("word/media/") && !name.ends_with('/'))
        .count()
}

#[cfg(test)]
mod word_export_tests {
    use super::*;

    #[test]
    fn test_docx_contains_page_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("notes.docx");
        let markup = common::sample_page("Weekly notes", 4);

        assert!(convert_page(
            &markup,
            "Weekly notes",
            ExportFormat::Docx,
            &output,
            &ExportOptions::default()
        ));

        let document = read_entry(&output, "word/document.xml");
        assert!(document.contains("Weekly notes"));
        assert!(document.contains("Agenda"));
        assert!(document.contains("Review budget &amp; timeline"));
        assert!(document.contains("项目进度 - 第一阶段"));
        assert!(document.contains("r3c3"));
        assert!(!document.contains("landscape"));
        assert_eq!(media_entries(&output), 1);
    }

    #[test]
    fn test_wide_table_gets_landscape_continuation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("wide.docx");
        let markup = format!("<Page>{}</Page>", common::table_markup(14, 2));

        assert!(convert_page(
            &markup,
            "Wide",
            ExportFormat::Docx,
            &output,
            &ExportOptions::default()
        ));

        let document = read_entry(&output, "word/document.xml");
        assert!(document.contains("Table 1 has 14 columns"));
        assert!(document.contains("Table 1 (full, 14 columns)"));
        assert!(document.contains("landscape"));
        // The last column only appears in the full continuation
        assert_eq!(document.matches("r2c13").count(), 1);
        assert_eq!(document.matches("r2c0").count(), 2);
    }

    #[test]
    fn test_undecodable_image_is_not_embedded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("broken-image.docx");
        let mut garbage = vec![0xFF, 0xD8, 0xFF, 0xE0];
        garbage.extend(std::iter::repeat_n(0x42, 296));
        let markup = format!(
            r#"<Page><Image data="{}"/><T>after the image</T></Page>"#,
            STANDARD.encode(&garbage)
        );

        assert!(convert_page(
            &markup,
            "Broken image",
            ExportFormat::Docx,
            &output,
            &ExportOptions::default()
        ));
        assert_eq!(media_entries(&output), 0);
        assert!(read_entry(&output, "word/document.xml").contains("after the image"));
    }

    #[test]
    fn test_images_can_be_disabled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("no-images.docx");
        let options = ExportOptions {
            include_images: false,
            ..ExportOptions::default()
        };

        assert!(convert_page(
            &common::sample_page("Weekly notes", 3),
            "Weekly notes",
            ExportFormat::Docx,
            &output,
            &options
        ));
        assert_eq!(media_entries(&output), 0);
    }
}
