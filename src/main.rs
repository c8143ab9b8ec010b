//! onenote-export CLI - convert exported note pages to Word and PDF

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, ValueEnum};
use log::{debug, error};

use onenote_export::content::ContentUnit;
use onenote_export::convert::{page_title, render_formats};
use onenote_export::{
    ExportFormat, ExportOptions, UnitWalker, parse_markup, sanitize_file_name,
};

#[derive(Parser)]
#[command(name = "onenote-export")]
#[command(version)]
#[command(about = "Convert note page markup into Word and PDF documents", long_about = None)]
struct Cli {
    /// Markup files, or directories containing *.xml pages
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output: PathBuf,

    /// Formats to produce (defaults to the config file setting)
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Skip images
    #[arg(long)]
    no_images: bool,

    /// Document title (single input only)
    #[arg(long)]
    title: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the extracted units as JSON instead of rendering
    #[arg(long)]
    dump_units: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Docx,
    Pdf,
    Both,
}

impl FormatArg {
    fn formats(self) -> Vec<ExportFormat> {
        match self {
            FormatArg::Docx => vec![ExportFormat::Docx],
            FormatArg::Pdf => vec![ExportFormat::Pdf],
            FormatArg::Both => vec![ExportFormat::Docx, ExportFormat::Pdf],
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut options = match &cli.config {
        Some(path) => ExportOptions::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ExportOptions::load().context("failed to load config")?,
    };
    if cli.no_images {
        options.include_images = false;
    }
    let formats = cli.format.map(FormatArg::formats).unwrap_or_else(|| options.formats.clone());
    if formats.is_empty() && !cli.dump_units {
        bail!("no output formats selected");
    }

    let pages = collect_inputs(&cli.inputs)?;
    if pages.is_empty() {
        bail!("no markup files found");
    }
    if cli.title.is_some() && pages.len() > 1 {
        bail!("--title can only be used with a single input file");
    }

    if !cli.dump_units {
        fs::create_dir_all(&cli.output)
            .with_context(|| format!("failed to create {}", cli.output.display()))?;
    }

    let mut failures = 0usize;
    for page in &pages {
        failures += convert_file(page, &cli, &formats, &options)?;
    }

    if failures > 0 {
        eprintln!("{failures} conversion(s) failed");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Convert one markup file, returning the number of failed formats
fn convert_file(
    path: &Path,
    cli: &Cli,
    formats: &[ExportFormat],
    options: &ExportOptions,
) -> Result<usize> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let parsed = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))
        .and_then(|markup| {
            parse_markup(&markup).with_context(|| format!("failed to parse {}", path.display()))
        });
    let root = match parsed {
        Ok(root) => root,
        Err(e) => {
            error!("{e:#}");
            let title = cli.title.clone().unwrap_or(stem);
            for format in formats {
                println!("✗ {format}: {title}");
            }
            return Ok(formats.len());
        }
    };

    let title = cli
        .title
        .clone()
        .or_else(|| page_title(&root))
        .unwrap_or(stem);

    if cli.dump_units {
        let units: Vec<ContentUnit> = UnitWalker::new(&root, options.include_images).collect();
        println!("{}", serde_json::to_string_pretty(&units)?);
        return Ok(0);
    }

    let file_name = sanitize_file_name(&title);
    let targets: Vec<(ExportFormat, PathBuf)> = formats
        .iter()
        .map(|format| {
            let target = cli.output.join(format!("{file_name}.{}", format.extension()));
            (*format, target)
        })
        .collect();
    debug!("converting {} as '{title}'", path.display());

    let mut failed = 0;
    for (format, ok) in render_formats(&root, &title, &targets, options) {
        if ok {
            println!("✓ {format}: {title}");
        } else {
            println!("✗ {format}: {title}");
            failed += 1;
        }
    }
    Ok(failed)
}

/// Expand directories into their *.xml files, sorted by name
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut pages = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(input)
                .with_context(|| format!("failed to read directory {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| {
                    p.is_file()
                        && p.extension()
                            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
                })
                .collect();
            found.sort();
            pages.extend(found);
        } else {
            pages.push(input.clone());
        }
    }
    Ok(pages)
}
