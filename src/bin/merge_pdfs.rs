//! Combines every PDF under a directory into one document

use board_pdf_crawler::merge::{collect_pdfs, merge_pdfs, LopdfPageWriter};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Merges downloaded PDFs into a single file
///
/// Files are taken in case-insensitive path order. Unreadable files are
/// reported and left out.
#[derive(Parser, Debug)]
#[command(name = "merge-pdfs")]
#[command(version = "1.0.0")]
#[command(about = "Merge all PDFs under a directory into one file", long_about = None)]
struct Cli {
    /// Directory scanned recursively for PDF files
    #[arg(long, default_value = "./mohw_pdfs")]
    input_dir: PathBuf,

    /// Path of the combined PDF
    #[arg(long, default_value = "./mohw_pdfs_combined.pdf")]
    output: PathBuf,

    /// Increase logging verbosity
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("board_pdf_crawler=debug,info")
    } else {
        EnvFilter::new("board_pdf_crawler=info,warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let inputs = match collect_pdfs(&cli.input_dir) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    println!(
        "Found {} PDF files under {}",
        inputs.len(),
        cli.input_dir.display()
    );

    let mut writer = LopdfPageWriter::new();
    let report = match merge_pdfs(&inputs, &cli.output, &mut writer) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Merged {} PDF files ({} pages) into {}",
        report.merged,
        report.pages,
        cli.output.display()
    );

    if !report.skipped.is_empty() {
        println!("\nSkipped {} files:", report.skipped.len());
        for (path, reason) in &report.skipped {
            println!("  - {}: {}", path.display(), reason);
        }
    }

    ExitCode::SUCCESS
}
