//! SHPZ CLI - Shapefile compressor/decompressor
//!
//! Compresses `.shp` containers into the compact `.shpz` format, or
//! decompresses `.shpz` files back into (lossy) `.shp` containers.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum Verbosity {
    /// Only log warnings and failures.
    #[default]
    Quiet,
    /// Log header information and basic progress.
    Normal,
    /// Log every record, part and span.
    Verbose,
}

impl Verbosity {
    /// Returns the tracing filter string for this verbosity level.
    fn as_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "shpz=warn",
            Verbosity::Normal => "shpz=info",
            Verbosity::Verbose => "shpz=trace",
        }
    }
}

/// Direction of the conversion, chosen from the input extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Compress,
    Decompress,
}

impl Mode {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "shp" => Some(Mode::Compress),
            "shpz" => Some(Mode::Decompress),
            _ => None,
        }
    }

    fn output_extension(self) -> &'static str {
        match self {
            Mode::Compress => "shpz",
            Mode::Decompress => "shp",
        }
    }
}

/// Shapefile <-> compact SHPZ converter
#[derive(Parser, Debug)]
#[command(name = "shpz")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file (.shp to compress, .shpz to decompress)
    input: PathBuf,

    /// Output file (defaults to the input with the other extension)
    output: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, value_enum, default_value_t = Verbosity::default())]
    verbosity: Verbosity,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing with the appropriate filter level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.verbosity.as_filter())),
        )
        .with_target(false)
        .with_level(true)
        .init();

    match run(&args) {
        Ok((output, read, written)) => {
            println!(
                "{} ({} bytes) -> {} ({} bytes)",
                args.input.display(),
                read,
                output.display(),
                written
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Conversion failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Main conversion logic. Returns the output path and the byte counts read
/// and written.
fn run(args: &Args) -> Result<(PathBuf, usize, usize), Box<dyn std::error::Error>> {
    let mode = Mode::from_path(&args.input).ok_or_else(|| {
        format!(
            "cannot tell direction from {}: expected a .shp or .shpz file",
            args.input.display()
        )
    })?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension(mode.output_extension()));

    info!("Reading input file: {}", args.input.display());
    let data = fs::read(&args.input)?;
    info!("Read {} bytes", data.len());

    let bytes = match mode {
        Mode::Compress => {
            let model = shpz::parse(&data)?;
            info!(
                "Parsed {} records of {}",
                model.records.len(),
                model.shape_type
            );
            shpz::compress(&model)?
        }
        Mode::Decompress => {
            let model = shpz::decompress(&data)?;
            info!(
                "Decompressed {} records of {}",
                model.records.len(),
                model.shape_type
            );
            shpz::encode(&model)?
        }
    };

    info!("Writing output file: {}", output.display());
    fs::write(&output, &bytes)?;

    Ok((output, data.len(), bytes.len()))
}
