//! TPF Unpacker CLI
//!
//! Extract the DDS textures bundled in .tpf containers, optionally converting
//! them with texconv.

use clap::{Parser, ValueEnum};
use log::{debug, error, info, warn, LevelFilter};
use rayon::prelude::*;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tpf_unpacker::convert::{convert_all, ConvertOptions, Texconv};
use tpf_unpacker::parser::{ErrorPolicy, LayoutVariant, ParseOptions, VariantSelection};
use tpf_unpacker::tpf::find_tpf_files;
use tpf_unpacker::{output, TpfFile};

#[derive(Parser)]
#[command(name = "tpf-unpack")]
#[command(about = "Extract DDS textures from FromSoftware .tpf containers")]
#[command(version)]
struct Cli {
    /// Input .tpf file(s), or directories containing them
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Output folder (for a single input) or parent folder (for multiple inputs)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Descriptor layout of the entry table
    #[arg(long, value_enum, default_value = "default")]
    layout: Layout,

    /// Accept files whose signature is not "TPF\0"
    #[arg(long)]
    no_signature_check: bool,

    /// Keep the entries before a malformed one instead of failing the file
    #[arg(long)]
    keep_partial: bool,

    /// Write manifest.json next to the extracted textures
    #[arg(long)]
    manifest: bool,

    /// Pretty-print the manifest
    #[arg(short, long, requires = "manifest")]
    pretty: bool,

    /// Print the entries as CSV instead of extracting them
    #[arg(long)]
    list: bool,

    /// Path to texconv; extracted textures are converted when given
    #[arg(long)]
    texconv: Option<PathBuf>,

    /// File type texconv converts to
    #[arg(long, default_value = "png")]
    convert_format: String,

    /// Keep the .dds files after converting them
    #[arg(long)]
    keep_dds: bool,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Layout {
    /// Guess from the shape of the entry table
    Auto,
    /// Dark Souls 3 and most other titles
    Default,
    /// Bloodborne
    Bloodborne,
}

impl Layout {
    fn selection(self) -> VariantSelection {
        match self {
            Layout::Auto => VariantSelection::Auto,
            Layout::Default => VariantSelection::Fixed(LayoutVariant::Default),
            Layout::Bloodborne => VariantSelection::Fixed(LayoutVariant::Bloodborne),
        }
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What happened to one input file.
#[derive(Default)]
struct Outcome {
    output_dir: Option<PathBuf>,
    listing: Option<String>,
    extracted: usize,
    skipped: usize,
    convert_failures: usize,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (inputs, mut error_count) = collect_inputs(&cli.input);
    if inputs.is_empty() {
        error!("No .tpf files to process");
        std::process::exit(1);
    }

    let options = ParseOptions {
        variant: cli.layout.selection(),
        check_signature: !cli.no_signature_check,
        error_policy: if cli.keep_partial {
            ErrorPolicy::KeepResolved
        } else {
            ErrorPolicy::Abort
        },
    };
    let converter = cli.texconv.as_ref().map(|program| {
        Texconv::new(
            program,
            ConvertOptions {
                format: cli.convert_format.clone(),
                keep_source: cli.keep_dds,
            },
        )
    });
    let multiple = inputs.len() > 1 || cli.input.iter().any(|p| p.is_dir());
    let found = inputs.len();
    let (inputs, conflicts) = claim_output_dirs(&cli, multiple, inputs);
    error_count += conflicts;

    // Files are independent; one failing never stops the others.
    let results: Vec<_> = inputs
        .par_iter()
        .map(|path| {
            let result = process_file(&cli, multiple, path, &options, converter.as_ref());
            (path, result)
        })
        .collect();

    let mut success_count = 0;
    let mut skipped_count = 0;
    let mut convert_failures = 0;

    for (input_path, result) in &results {
        match result {
            Ok(outcome) => {
                success_count += 1;
                skipped_count += outcome.skipped;
                convert_failures += outcome.convert_failures;
                if let Some(listing) = &outcome.listing {
                    if multiple {
                        println!("# {}", input_path.display());
                    }
                    print!("{}", listing);
                }
                if let Some(dir) = &outcome.output_dir {
                    debug!(
                        "{} -> {} ({} textures)",
                        input_path.display(),
                        dir.display(),
                        outcome.extracted
                    );
                }
            }
            Err(e) => {
                error_count += 1;
                error!("Error processing {}: {}", input_path.display(), e);
            }
        }
    }

    if multiple {
        info!(
            "Processed {} file(s): {} success, {} errors",
            found,
            success_count,
            error_count
        );
    }
    if skipped_count > 0 {
        warn!("{} entries skipped because of unusable names", skipped_count);
    }
    if convert_failures > 0 {
        warn!("{} textures failed to convert", convert_failures);
    }

    if error_count > 0 {
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_module("tpf_unpacker", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();
}

/// Expand directories into the .tpf files they contain.
/// Returns the files and the number of directories that couldn't be read.
fn collect_inputs(paths: &[PathBuf]) -> (Vec<PathBuf>, usize) {
    let mut files = Vec::new();
    let mut errors = 0;

    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        match find_tpf_files(path) {
            Ok(found) => {
                if found.is_empty() {
                    warn!("No .tpf files in {}", path.display());
                }
                files.extend(found);
            }
            Err(e) => {
                errors += 1;
                error!("Error reading {}: {}", path.display(), e);
            }
        }
    }

    (files, errors)
}

fn process_file(
    cli: &Cli,
    multiple: bool,
    input_path: &Path,
    options: &ParseOptions,
    converter: Option<&Texconv>,
) -> Result<Outcome, BoxError> {
    let tpf = TpfFile::from_file(input_path, options)?;
    let container = &tpf.container;

    debug!(
        "{}: {} entries, {:?} layout",
        input_path.display(),
        container.len(),
        container.variant
    );
    if let Some(e) = &container.incomplete {
        warn!(
            "{}: kept {} of {} entries: {}",
            input_path.display(),
            container.len(),
            container.header.entry_count,
            e
        );
    }

    if cli.list {
        return Ok(Outcome {
            listing: Some(output::to_listing_string(container)?),
            ..Outcome::default()
        });
    }

    let output_dir = get_output_dir(cli, multiple, input_path);
    let report = output::write_dds_files(container, &output_dir)?;

    if cli.manifest {
        let file = File::create(output_dir.join("manifest.json"))?;
        let mut writer = BufWriter::new(file);
        output::write_manifest(&tpf, &mut writer, cli.pretty)?;
        writer.flush()?;
    }

    let convert_failures = converter
        .map(|c| convert_all(c, &report.written).failed.len())
        .unwrap_or(0);

    Ok(Outcome {
        output_dir: Some(output_dir),
        listing: None,
        extracted: report.written.len(),
        skipped: report.skipped.len(),
        convert_failures,
    })
}

/// Keep the first input for each output folder and drop the rest, so no two
/// files extract into the same folder. Returns the kept inputs and the number
/// dropped.
fn claim_output_dirs(cli: &Cli, multiple: bool, inputs: Vec<PathBuf>) -> (Vec<PathBuf>, usize) {
    if cli.list {
        return (inputs, 0);
    }

    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut kept = Vec::with_capacity(inputs.len());
    let mut dropped = 0;

    for input in inputs {
        match claimed.entry(get_output_dir(cli, multiple, &input)) {
            Entry::Occupied(e) => {
                dropped += 1;
                error!(
                    "Skipping {}: output folder {} is already used by {}",
                    input.display(),
                    e.key().display(),
                    e.get().display()
                );
            }
            Entry::Vacant(e) => {
                e.insert(input.clone());
                kept.push(input);
            }
        }
    }

    (kept, dropped)
}

fn get_output_dir(cli: &Cli, multiple: bool, input_path: &Path) -> PathBuf {
    let default_dir = TpfFile::default_output_dir(input_path);

    match &cli.output {
        // Single file: the output folder receives the textures directly
        Some(output) if !multiple => output.clone(),
        // Multiple files: one subfolder per input
        Some(output) => output.join(default_dir.file_name().unwrap_or_default()),
        // No output specified: create alongside input
        None => default_dir,
    }
}
