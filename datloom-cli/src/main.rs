//! datloom CLI
//!
//! Command-line interface for converting ROM-cataloging DAT files
//! between dialects through the canonical metadata tree.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use datloom_formats::Format;

mod commands;
mod error;

use commands::{run_convert, run_dump, run_identify, run_list_formats};

#[derive(Parser)]
#[command(name = "datloom")]
#[command(about = "Convert ROM-cataloging DAT files between dialects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a DAT file to another dialect
    Convert {
        /// Input file
        input: PathBuf,

        /// Output file
        output: PathBuf,

        /// Input dialect (detected from the file when omitted)
        #[arg(short, long)]
        from: Option<Format>,

        /// Output dialect (inferred from the output extension when omitted)
        #[arg(short, long)]
        to: Option<Format>,
    },

    /// Detect the dialect of one or more DAT files
    Identify {
        /// Files to inspect
        files: Vec<PathBuf>,
    },

    /// Parse a DAT file and print its canonical tree as JSON
    Dump {
        /// Input file
        input: PathBuf,

        /// Input dialect (detected from the file when omitted)
        #[arg(short, long)]
        from: Option<Format>,
    },

    /// List all supported dialects
    ListFormats,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            from,
            to,
        } => run_convert(&input, &output, from, to),
        Commands::Identify { files } => run_identify(&files),
        Commands::Dump { input, from } => run_dump(&input, from),
        Commands::ListFormats => run_list_formats(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
