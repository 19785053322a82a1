mod cdl;
mod commands;

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Build NetCDF classic datasets from templates, and copy subsets of existing ones
#[derive(Parser, Debug)]
#[command(name = "ncbuild", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a dataset from a JSON or YAML template, every variable holding its fill value
    Create { template: PathBuf },

    /// Copy a hyperslab of every variable in SOURCE into a new dataset at TARGET
    Subset {
        source: PathBuf,
        target: PathBuf,

        /// Narrow a dimension, eg `time=0:364`. May be repeated.
        #[arg(long = "range", value_name = "DIM=FIRST:LAST")]
        ranges: Vec<String>,

        /// Number of leading-axis indices copied at a time
        #[arg(long, default_value = "1000", env = "NCBUILD_CHUNK_SIZE")]
        chunk_size: usize,
    },

    /// Print the decoded dates of a time variable
    Dates {
        file: PathBuf,

        #[arg(long, default_value = "time")]
        variable: String,
    },

    /// Print a dataset's dimensions, variables and attributes
    Header { file: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut out = io::stdout().lock();
    match args.command {
        Command::Create { template } => {
            let path = commands::create(&template)?;
            writeln!(out, "{}", path.display())?;
        }
        Command::Subset {
            source,
            target,
            ranges,
            chunk_size,
        } => commands::subset(&source, &target, &ranges, chunk_size)?,
        Command::Dates { file, variable } => commands::dates(&mut out, &file, &variable)?,
        Command::Header { file } => commands::header(&mut out, &file)?,
    }

    Ok(())
}
