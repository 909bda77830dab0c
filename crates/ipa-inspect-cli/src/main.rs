//! Command-line interface for the ipa-inspect package analyzer.
//!
//! Analyzes an IPA and prints either a human-readable summary or the full
//! analysis record as JSON.

use clap::Parser;
use ipa_inspect::{AnalysisResult, Analyzer};
use std::fmt;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ipa-inspect")]
#[command(about = "Inspect an iOS app package and its code signature")]
struct Cli {
    /// Input IPA file
    input: PathBuf,

    /// Print the full analysis as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,

    /// Parent directory for scratch workspaces (default: system temp dir)
    #[arg(long, env = "IPA_INSPECT_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Maximum total uncompressed size in bytes
    #[arg(long, default_value_t = ipa_inspect::ipa::extract::DEFAULT_MAX_TOTAL_SIZE)]
    max_size: u64,

    /// Maximum number of archive entries
    #[arg(long, default_value_t = ipa_inspect::ipa::extract::DEFAULT_MAX_ENTRIES)]
    max_entries: usize,

    /// Extract and inspect on a single thread
    #[arg(long)]
    sequential: bool,

    /// Accept inputs without a .ipa extension
    #[arg(long)]
    no_extension_check: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("ipa_inspect=debug")
    } else {
        EnvFilter::new("ipa_inspect=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    debug!("Logging initialized (verbose={})", cli.verbose);

    if !cli.no_extension_check && !has_ipa_extension(&cli.input) {
        return Err(format!(
            "{} is not an .ipa file (use --no-extension-check to analyze it anyway)",
            cli.input.display()
        )
        .into());
    }

    let mut analyzer = Analyzer::new()
        .max_total_size(cli.max_size)
        .max_entries(cli.max_entries)
        .parallel(!cli.sequential);

    if let Some(dir) = cli.scratch_dir {
        analyzer = analyzer.scratch_dir(dir);
    }

    let result = analyzer.analyze_path(&cli.input)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let mut summary = String::new();
        render(&result, &mut summary)?;
        print!("{}", summary);
    }
    Ok(())
}

fn has_ipa_extension(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("ipa"))
        .unwrap_or(false)
}

/// Write a human-readable summary of an analysis to `out`.
fn render(result: &AnalysisResult, out: &mut impl fmt::Write) -> fmt::Result {
    let architectures = if result.architectures.is_empty() {
        "Unknown".to_string()
    } else {
        result.architectures.join(", ")
    };
    let status = if result.is_signed { "SIGNED" } else { "NOT SIGNED" };
    let megabytes = result.file_size as f64 / 1024.0 / 1024.0;

    writeln!(out, "IPA Analysis: {}", result.bundle_name)?;
    writeln!(out, "  Signing Status: {}", status)?;
    writeln!(out, "  File Size:      {:.2} MB", megabytes)?;
    writeln!(out, "  Architectures:  {}", architectures)?;
    writeln!(out, "  Frameworks:     {}", result.embedded_frameworks)?;
    writeln!(out, "  Plugins:        {}", result.plugins)?;

    if let Some(identity) = &result.signature.signer_identity {
        writeln!(out, "  Bundle ID:      {}", identity.bundle_identifier)?;
        if let Some(team) = &identity.team_identifier {
            writeln!(out, "  Team ID:        {}", team)?;
        }
        writeln!(out, "  Format:         {}", identity.format)?;
        if !identity.authorities.is_empty() {
            writeln!(out, "  Signing Authorities:")?;
            for authority in &identity.authorities {
                writeln!(out, "    • {}", authority)?;
            }
        }
    }

    if let Some(entitlements) = &result.signature.entitlements {
        let keys = entitlements.keys();
        if !keys.is_empty() {
            writeln!(out, "  Capabilities:   {}", keys.join(", "))?;
        }
    }

    for note in &result.diagnostics {
        writeln!(out, "  Note: {}", note)?;
    }
    Ok(())
}
