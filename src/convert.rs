//! Page conversion entry points
//!
//! A page is parsed once and rendered once per requested format. Each
//! (page, format) pair reports its own success; a page that fails to parse
//! produces no files at all.

use std::path::{Path, PathBuf};

use log::{error, info};

use crate::ExportFormat;
use crate::config::ExportOptions;
use crate::content::{ContentNode, parse_markup};
use crate::error::Result;
use crate::render::{PdfRenderer, UnitRenderer, WordRenderer, render_page};

const MAX_FILE_NAME_CHARS: usize = 100;

/// Convert one page to one format. Returns `false` on any page-level failure.
pub fn convert_page(
    markup: &str,
    title: &str,
    format: ExportFormat,
    output: &Path,
    options: &ExportOptions,
) -> bool {
    convert_page_formats(markup, title, &[(format, output.to_path_buf())], options)
        .first()
        .is_some_and(|(_, ok)| *ok)
}

/// Convert one page to several formats, parsing the markup once
pub fn convert_page_formats(
    markup: &str,
    title: &str,
    targets: &[(ExportFormat, PathBuf)],
    options: &ExportOptions,
) -> Vec<(ExportFormat, bool)> {
    let root = match parse_markup(markup) {
        Ok(root) => root,
        Err(e) => {
            error!("page '{title}': {e}");
            return targets.iter().map(|(format, _)| (*format, false)).collect();
        }
    };

    render_formats(&root, title, targets, options)
}

/// Render an already parsed page to each target, logging the outcome per format
pub fn render_formats(
    root: &ContentNode,
    title: &str,
    targets: &[(ExportFormat, PathBuf)],
    options: &ExportOptions,
) -> Vec<(ExportFormat, bool)> {
    targets
        .iter()
        .map(|(format, path)| {
            let ok = match render_tree(root, title, *format, path, options) {
                Ok(()) => {
                    info!("page '{title}' exported as {format}");
                    true
                }
                Err(e) => {
                    error!("page '{title}' {format} export failed: {e}");
                    false
                }
            };
            (*format, ok)
        })
        .collect()
}

/// Render an already parsed page, propagating the page-level error
pub fn render_tree(
    root: &ContentNode,
    title: &str,
    format: ExportFormat,
    path: &Path,
    options: &ExportOptions,
) -> Result<()> {
    let mut renderer = new_renderer(format, options);
    render_page(renderer.as_mut(), root, title, options.include_images, path)
}

fn new_renderer(format: ExportFormat, options: &ExportOptions) -> Box<dyn UnitRenderer> {
    match format {
        ExportFormat::Docx => Box::new(WordRenderer::new()),
        ExportFormat::Pdf => Box::new(PdfRenderer::new(options.pdf_font.clone())),
    }
}

/// Page title from the root's `name` attribute, if present and non-blank
pub fn page_title(root: &ContentNode) -> Option<String> {
    root.attr("name")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Reduce a title to a safe file name stem
pub fn sanitize_file_name(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'))
        .collect();
    let trimmed: String = kept.trim().chars().take(MAX_FILE_NAME_CHARS).collect();
    let trimmed = trimmed.trim();
    if trimmed.is_empty() {
        "Untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Meeting: 2024/05/01?"), "Meeting 20240501");
        assert_eq!(sanitize_file_name("  项目 计划_v1.2 "), "项目 计划_v1.2");
        assert_eq!(sanitize_file_name("***"), "Untitled");
        assert_eq!(sanitize_file_name(""), "Untitled");
        assert_eq!(sanitize_file_name(&"a".repeat(150)).len(), 100);
    }

    #[test]
    fn test_page_title() {
        let root = parse_markup(r#"<Page name=" Weekly notes "/>"#).expect("valid");
        assert_eq!(page_title(&root).as_deref(), Some("Weekly notes"));
        let root = parse_markup(r#"<Page name="  "/>"#).expect("valid");
        assert_eq!(page_title(&root), None);
    }

    #[test]
    fn test_parse_failure_fails_every_format() {
        let dir = tempfile::tempdir().expect("tempdir");
        let targets = vec![
            (ExportFormat::Docx, dir.path().join("p.docx")),
            (ExportFormat::Pdf, dir.path().join("p.pdf")),
        ];
        let results =
            convert_page_formats("<Page><OE>", "Broken", &targets, &ExportOptions::default());
        assert_eq!(
            results,
            vec![(ExportFormat::Docx, false), (ExportFormat::Pdf, false)]
        );
        assert!(!targets[0].1.exists());
        assert!(!targets[1].1.exists());
    }
}
