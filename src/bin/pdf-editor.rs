//! PDF Editor CLI tool
//!
//! Rotates pages, replaces text in content streams and stamps a footer logo.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

use pdf_editor::pdf::{FooterSpec, PdfDocument, ReplacementSpec, RotationSpec};
use pdf_editor::{edit_pdf, EditOptions, EditReport};

/// PDF Editor - rotate pages, replace text/URLs, add a footer logo
#[derive(Parser)]
#[command(name = "pdf-editor")]
#[command(author, version, about, long_about = None)]
#[command(subcommand_negates_reqs = true)]
#[command(after_help = "EXAMPLES:
    # Rotate pages 1 and 3
    pdf-editor --input document.pdf --output fixed.pdf --rotate \"1:90,3:180\"

    # Replace an old wiki link and add a logo to every page
    pdf-editor --input document.pdf --output fixed.pdf \\
        --replace-url team-wiki.local team-wiki.etc.com --footer-image logo.png

    # Apply the same edits to many files
    pdf-editor batch --output-dir fixed/ --footer-image logo.png \"docs/*.pdf\"

    # Show page sizes and rotations
    pdf-editor info fixed.pdf")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input PDF file
    #[arg(short, long, required = true)]
    input: Option<PathBuf>,

    /// Output PDF file path (created or overwritten)
    #[arg(short, long, required = true)]
    output: Option<PathBuf>,

    #[command(flatten)]
    edits: EditArgs,

    /// Show debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Args, Clone)]
struct EditArgs {
    /// Pages to rotate as "page:angle,page:angle" (e.g., "1:90,3:180")
    #[arg(long, value_name = "SPEC")]
    rotate: Option<String>,

    /// Replace text/URL in page content (e.g., team-wiki.local team-wiki.etc.com)
    #[arg(long, alias = "replace", num_args = 2, value_names = ["OLD", "NEW"])]
    replace_url: Option<Vec<String>>,

    /// Add an image to the footer of every page (PNG/JPEG)
    #[arg(long, value_name = "PATH")]
    footer_image: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the same edits to several PDF files
    Batch {
        /// Input PDF files. Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Directory to write edited files into (same file names as the inputs)
        #[arg(short = 'd', long)]
        output_dir: PathBuf,

        #[command(flatten)]
        edits: EditArgs,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Some(Commands::Batch { inputs, output_dir, edits }) => {
            cmd_batch(inputs, &output_dir, &edits, cli.quiet)
        }
        Some(Commands::Info { input }) => cmd_info(&input),
        None => match (cli.input, cli.output) {
            (Some(input), Some(output)) => cmd_edit(input, output, &cli.edits, cli.quiet),
            _ => Err(anyhow::anyhow!("--input and --output are required")),
        },
    };

    if let Err(e) = result {
        eprintln!("{}", error_message(&e));
        process::exit(1);
    }
}

/// User-facing error line, tagged with the failing stage when known
fn error_message(e: &anyhow::Error) -> String {
    match e.downcast_ref::<pdf_editor::Error>() {
        Some(err) => format!("Error ({}): {}", err.stage(), err),
        None => format!("Error: {:#}", e),
    }
}

/// Install the stderr log subscriber; `RUST_LOG` takes precedence over flags
fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Turn command-line edit flags into library options
fn build_options(edits: &EditArgs, input: PathBuf, output: PathBuf) -> pdf_editor::Result<EditOptions> {
    let mut options = EditOptions::new(input, output);

    if let Some(ref spec) = edits.rotate {
        options.rotate = Some(spec.parse::<RotationSpec>()?);
    }

    if let Some(ref pair) = edits.replace_url {
        if let [old, new] = pair.as_slice() {
            options.replace = Some(ReplacementSpec::new(old.as_bytes(), new.as_bytes())?);
        }
    }

    if let Some(ref path) = edits.footer_image {
        options.footer = Some(FooterSpec::new(path));
    }

    Ok(options)
}

/// Print what each stage did
fn print_report(report: &EditReport) {
    for (stage, outcome) in &report.outcomes {
        match outcome {
            pdf_editor::StageOutcome::Rotated { rotated, skipped } => {
                eprintln!("  {}: {} page(s) rotated", stage, rotated.len());
                if !skipped.is_empty() {
                    eprintln!(
                        "  {}: ignored page(s) {:?} (document has {} pages)",
                        stage, skipped, report.page_count
                    );
                }
            }
            pdf_editor::StageOutcome::Replaced { replacements, .. } => {
                eprintln!("  {}: {} occurrence(s) replaced", stage, replacements);
            }
            pdf_editor::StageOutcome::Footer { placements } => {
                eprintln!("  {}: logo added to {} page(s)", stage, placements.len());
            }
        }
    }
}

/// Edit a single PDF
fn cmd_edit(input: PathBuf, output: PathBuf, edits: &EditArgs, quiet: bool) -> anyhow::Result<()> {
    let options = build_options(edits, input, output)?;

    let report = edit_pdf(&options)?;

    if !quiet {
        print_report(&report);
        eprintln!("PDF processed successfully: {}", options.output.display());
    }

    Ok(())
}

/// Apply the same edits to every input, one file at a time
fn cmd_batch(inputs: Vec<String>, output_dir: &Path, edits: &EditArgs, quiet: bool) -> anyhow::Result<()> {
    let inputs = expand_globs(inputs)?;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let mut failed = 0;
    for input in &inputs {
        let file_name = match input.file_name() {
            Some(name) => name,
            None => {
                eprintln!("Skipping {}: not a file", input.display());
                failed += 1;
                continue;
            }
        };
        let output = output_dir.join(file_name);

        if same_file(input, &output) {
            eprintln!("Skipping {}: output would overwrite the input", input.display());
            failed += 1;
            continue;
        }

        let result = build_options(edits, input.clone(), output.clone()).and_then(|o| edit_pdf(&o));
        match result {
            Ok(_) => {
                if !quiet {
                    eprintln!("{} -> {}", input.display(), output.display());
                }
            }
            Err(e) => {
                eprintln!("Failed ({}): {}", e.stage(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} files failed", failed, inputs.len());
    }

    if !quiet {
        eprintln!("Processed {} files into {}", inputs.len(), output_dir.display());
    }
    Ok(())
}

/// Expand glob patterns in input paths
fn expand_globs(patterns: Vec<String>) -> pdf_editor::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let entries = glob(&pattern)
                .map_err(|e| pdf_editor::Error::InvalidGlob(format!("{}: {}", pattern, e)))?;

            let mut matched = false;
            for entry in entries {
                match entry {
                    Ok(path) => {
                        paths.push(path);
                        matched = true;
                    }
                    Err(e) => tracing::warn!(%pattern, error = %e, "Unreadable glob match"),
                }
            }
            if !matched {
                return Err(pdf_editor::Error::NoFilesMatched(pattern));
            }
        } else {
            // No glob characters, treat as literal path
            paths.push(PathBuf::from(pattern));
        }
    }

    // Sort paths for consistent ordering
    paths.sort();
    paths.dedup();

    Ok(paths)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Show information about a PDF
fn cmd_info(input: &Path) -> anyhow::Result<()> {
    let doc = PdfDocument::load(input)?;
    let metadata = doc.metadata();

    println!("File: {}", input.display());
    println!("Pages: {}", doc.page_count());

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }

    for page in doc.pages()? {
        println!(
            "  Page {:>3}: {} x {} pt, rotate {}, {}",
            page.ordinal,
            page.dimensions.width,
            page.dimensions.height,
            page.rotation,
            if page.has_content { "content" } else { "no content" }
        );
    }

    Ok(())
}
