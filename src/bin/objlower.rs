//! objlower driver binary.
//!
//! Lowers an IR object file to a native x86-32 ELF object. The output path
//! defaults to the input with its extension replaced by `.o`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::LevelFilter;

use objlower::{process_file, Target};

#[derive(Parser)]
#[command(name = "objlower")]
#[command(version)]
#[command(about = "Lower IR object files to native object files", long_about = None)]
struct Cli {
    /// Input IR object file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output object file (default: input with extension .o)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target architecture
    #[arg(short, long, value_enum, default_value = "x86_32")]
    arch: Arch,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Arch {
    /// 32-bit x86
    #[value(name = "x86_32")]
    X86,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // RUST_LOG still wins when set.
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("o"));
    let target = match cli.arch {
        Arch::X86 => Target::X86,
    };

    match process_file(&cli.input, &output, target) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("objlower: {e}");
            ExitCode::FAILURE
        }
    }
}
