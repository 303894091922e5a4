use clap::{Parser, Subcommand};
use blzlut::{parse, ChecksumStatus, LoadOutcome, LoaderConfig, LutError, LutLoader, LutTable};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blzlut", about = "Inspect and query BLZ lookup tables")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show header fields and decode statistics
    Info {
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print the check method for one or more 8-digit bank codes
    Lookup {
        input: PathBuf,
        #[arg(required = true, num_args = 1..)]
        bank_codes: Vec<String>,
    },
    /// Print every bank code and its check method
    Dump {
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Recompute the Format 1.x checksum
    Verify {
        input: PathBuf,
    },
    /// Load the configured table (BLZ_LUT_* env), downloading it if missing
    Fetch,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input, json } => {
            let table = open_table(&input)?;
            let info  = table.info();
            if json {
                println!("{}", serde_json::to_string_pretty(info)?);
                return Ok(());
            }
            println!("── BLZ Lookup Table ─────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Format         {}", info.format);
            for line in &info.header_lines {
                println!("  Header         {line}");
            }
            println!("  Declared       {}", info.declared_entries);
            if let Some(total) = info.declared_total {
                println!("  Total count    {total}");
            }
            println!("  Entries        {}", table.len());
            println!("  Skipped        {}", info.skipped);
            println!("  Duplicates     {}", info.duplicates);
            println!("  Truncated      {}", info.truncated);
            println!("  Checksum       {}", describe_checksum(&info.checksum));
            println!("  BLAKE3         {}", info.source_digest);
        }

        // ── Lookup ───────────────────────────────────────────────────────────
        Commands::Lookup { input, bank_codes } => {
            let table = open_table(&input)?;
            for code in &bank_codes {
                match table.lookup(code) {
                    Some(method) => println!("{code}  {method:02}"),
                    None         => println!("{code}  unknown"),
                }
            }
        }

        // ── Dump ─────────────────────────────────────────────────────────────
        Commands::Dump { input, json } => {
            let table = open_table(&input)?;
            if json {
                let map: serde_json::Map<String, serde_json::Value> = table
                    .iter()
                    .map(|(code, method)| (code.to_owned(), method.into()))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                for (code, method) in table.iter() {
                    println!("{code}  {method:02}");
                }
            }
        }

        // ── Verify ───────────────────────────────────────────────────────────
        Commands::Verify { input } => {
            let table = open_table(&input)?;
            println!("{}: {}", input.display(), describe_checksum(&table.info().checksum));
            if let ChecksumStatus::Mismatch { stored, computed } = table.info().checksum {
                return Err(LutError::ChecksumMismatch { stored, computed }.into());
            }
        }

        // ── Fetch ────────────────────────────────────────────────────────────
        Commands::Fetch => {
            let config = LoaderConfig::from_env();
            config.validate()?;
            let loader = LutLoader::from_config(&config);
            match loader.ensure_loaded() {
                LoadOutcome::Loaded => {
                    if let Some(table) = loader.table() {
                        println!("Loaded {} entries (format {}) from {}",
                            table.len(), table.format(), config.lut_path.display());
                    }
                }
                outcome => {
                    return Err(format!("BLZ lookup table not loaded: {outcome:?}").into());
                }
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn open_table(path: &Path) -> Result<LutTable, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)?;
    Ok(parse(&bytes)?)
}

fn describe_checksum(status: &ChecksumStatus) -> String {
    match status {
        ChecksumStatus::Verified => "ok".into(),
        ChecksumStatus::Mismatch { stored, computed } =>
            format!("MISMATCH (stored {stored:#010x}, computed {computed:#010x})"),
        ChecksumStatus::NotChecked => "not checked (Format 2.0)".into(),
    }
}
