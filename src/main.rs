use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wpack::{extract_all, Archive, FileRange, FsStore, OutputPattern, UnpackOptions};

#[derive(Parser)]
#[command(name = "wpack", about = "Pack files into a single indexed blob and unpack them again")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack one or more files into an archive, in the order given
    Pack {
        #[arg(short = 'f', long = "file")]
        output: PathBuf,
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
    },
    /// Unpack every file of an archive
    Unpack {
        #[arg(short = 'f', long = "file")]
        input: PathBuf,
        /// Output name; one %d-style placeholder receives the file index
        #[arg(short, long, default_value = "%03d")]
        pattern: OutputPattern,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        /// Fail instead of replacing files that already exist
        #[arg(long)]
        no_overwrite: bool,
    },
    /// List the index records of an archive
    List {
        #[arg(short = 'f', long = "file")]
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct Listing<'a> {
    file_count:   usize,
    index_size:   usize,
    archive_size: usize,
    files:        &'a [FileRange],
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { output, inputs } => {
            let ar = Archive::from_sources(&FsStore, inputs.as_slice())?;
            ar.save(&FsStore, &output)?;
            for path in &inputs {
                println!("  packed  {}", path.display());
            }
            println!("Created: {} ({} files, {} bytes)", output.display(), ar.file_count(), ar.archive_len());
        }

        // ── Unpack ───────────────────────────────────────────────────────────
        Commands::Unpack { input, pattern, output_dir, no_overwrite } => {
            let ar = Archive::load(&FsStore, &input)?;
            let opts = UnpackOptions { output_dir, overwrite: !no_overwrite };
            for path in extract_all(&ar, &pattern, &FsStore, &opts)? {
                println!("  wrote  {}", path.display());
            }
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, json } => {
            let ar = Archive::load(&FsStore, &input)?;
            if json {
                let listing = Listing {
                    file_count:   ar.file_count(),
                    index_size:   ar.index_len(),
                    archive_size: ar.archive_len(),
                    files:        ar.ranges(),
                };
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                println!("Archive: {}", input.display());
                println!("{:>6} {:>12} {:>12}", "Index", "Offset", "Length");
                for (i, r) in ar.ranges().iter().enumerate() {
                    println!("{:>6} {:>12} {:>12}", i, r.start_offset, r.length);
                }
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
