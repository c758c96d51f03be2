mod error;
mod logging;
mod prompt;
mod report;
mod table;

use anyhow::Result;
use clap::Parser;
use report::write_weekly_prompts;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the weekly summary CSV file
    #[arg(default_value = "data/processed/weekly_summary.csv")]
    summary: PathBuf,

    /// Path to the per-persona weekly CSV file
    #[arg(default_value = "data/processed/persona_weekly.csv")]
    personas: PathBuf,

    /// Directory to write the prompt files and index into
    #[arg(default_value = "reports/weekly_prompts")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let report =
        write_weekly_prompts(&args.summary, &args.personas, &args.out_dir)?;

    println!(
        "✅ Wrote {} weekly prompt files to: {}",
        report.entries.len(),
        report.out_dir.display()
    );
    println!("✅ Index: {}", report.index_path.display());
    Ok(())
}
