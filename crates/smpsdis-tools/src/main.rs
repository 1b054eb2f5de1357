use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod smps;
use smps::{bank as smps_bank, disasm as smps_disasm, info as smps_info, read_input_as_vec};

/// smpsdis command line tools
#[derive(Parser)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None
)]
struct Cli {
    /// Log engine progress (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Clone, Debug)]
pub struct DisasmArgs {
    /// SMPS engine version: 1 (Sonic 1), 2 (Sonic 2), 3 or more (Sonic 3 & Knuckles)
    #[arg(short, long, default_value_t = 2)]
    pub engine: u8,
    /// Treat the header as a sound effect header
    #[arg(long)]
    pub sfx: bool,
    /// Offset of the header in the input (decimal, 0x.. or $..)
    #[arg(long, default_value = "0", value_parser = parse_offset)]
    pub offset: usize,
    /// Base added to pointers (defaults to the header offset for version 1, 0 otherwise)
    #[arg(long, value_parser = parse_base, allow_hyphen_values = true)]
    pub base: Option<isize>,
    /// Label prefix (defaults to the input file name)
    #[arg(short, long)]
    pub project: Option<String>,
    /// Read 16-bit fields little-endian
    #[arg(long)]
    pub little_endian: bool,
    /// Re-emit the implicit rests of the Sonic 3 & Knuckles driver
    #[arg(long)]
    pub s3k_rest: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Disassemble one song or sound effect (use '-' for stdin; gzip input is accepted)
    Disasm {
        /// Input file to read (use '-' for stdin)
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Write the listing here instead of stdout
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
        #[command(flatten)]
        args: DisasmArgs,
    },
    /// Disassemble every entry of a little-endian pointer table
    Bank {
        /// Input file to read (use '-' for stdin)
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Offset of the pointer table
        #[arg(long, value_parser = parse_offset)]
        table: usize,
        /// Number of table entries
        #[arg(long)]
        count: usize,
        /// Write the listing here instead of stdout
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
        #[command(flatten)]
        args: DisasmArgs,
    },
    /// Show header fields and exploration statistics
    Info {
        /// Input file to read (use '-' for stdin)
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[command(flatten)]
        args: DisasmArgs,
    },
}

fn parse_offset(s: &str) -> Result<usize, String> {
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix('$')) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };
    usize::from_str_radix(digits, radix).map_err(|e| format!("invalid offset '{}': {}", s, e))
}

fn parse_base(s: &str) -> Result<isize, String> {
    match s.strip_prefix('-') {
        Some(rest) => parse_offset(rest).map(|v| -(v as isize)),
        None => parse_offset(s).map(|v| v as isize),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Disasm { file, output, args } => {
            let bytes = read_input_as_vec(&file)?;
            smps_disasm(&file, bytes, &args, output.as_deref())?;
        }
        Commands::Bank {
            file,
            table,
            count,
            output,
            args,
        } => {
            let bytes = read_input_as_vec(&file)?;
            smps_bank(&file, bytes, table, count, &args, output.as_deref())?;
        }
        Commands::Info { file, args } => {
            let bytes = read_input_as_vec(&file)?;
            smps_info(&file, bytes, &args)?;
        }
    }

    Ok(())
}
