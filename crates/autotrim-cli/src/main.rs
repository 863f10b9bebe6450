//! autotrim: find an image's content box and crop to it.
//!
//! Prints the detected rectangle for an image file. With `-o` the image
//! is also cropped (grown by `--margin`, padded where the crop runs past
//! the source) and written out, and per-stage timings are reported.
//!
//! # Usage
//!
//! ```text
//! autotrim [OPTIONS] <INPUT>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use autotrim_core::diagnostics::{
    Clock, TrimDiagnostics, process_with_diagnostics, run_with_diagnostics,
};
use autotrim_core::pipeline::{Decoded, EdgesDetected, Pending};
use autotrim_core::{ComputeBackend, EdgeMode, Pipeline, Rectangle, RgbaImage, TrimConfig};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Outline width for `--overlay`, in pixels.
const OVERLAY_THICKNESS: u32 = 2;

/// Detect the content bounding box of an image and optionally crop to it.
#[derive(Parser)]
#[command(name = "autotrim", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Write the cropped image here (format from the extension).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Edge strengths strictly above this count as content.
    #[arg(long, default_value_t = TrimConfig::DEFAULT_LIMIT, allow_negative_numbers = true)]
    limit: i32,

    /// What each pixel is compared against.
    #[arg(long, value_enum, default_value_t = Mode::Neighbor)]
    mode: Mode,

    /// Pixels added on every side of the detected box (negative shrinks).
    #[arg(long, default_value_t = TrimConfig::DEFAULT_MARGIN, allow_negative_numbers = true)]
    margin: i32,

    /// Fill color for area outside the source, as `#rgb`, `#rrggbb` or
    /// `#rrggbbaa`. Defaults to the top-left pixel.
    #[arg(long)]
    padding: Option<String>,

    /// Where the edge scan runs.
    #[arg(long, value_enum, default_value_t = Backend::Parallel)]
    backend: Backend,

    /// Write a copy of the input with the crop box outlined.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Write the per-pixel edge strength as a grayscale image.
    #[arg(long)]
    edge_map: Option<PathBuf>,

    /// Print results as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Full trim config as a JSON string.
    ///
    /// When provided, all other trim parameter flags are ignored.
    #[arg(long)]
    config_json: Option<String>,

    /// Number of cropping runs, for timing.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// More logging (`-v` info, `-vv` debug). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Edge mode selection.
#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Compare each pixel with its neighbors.
    Neighbor,
    /// Compare each pixel with the outer rows and columns.
    Border,
}

/// Compute backend selection.
#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    /// Single thread.
    Scalar,
    /// Thread pool.
    Parallel,
    /// Hardware compute (not available in this build).
    Gpu,
}

/// Build a [`TrimConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<TrimConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let padding = cli
        .padding
        .as_deref()
        .map(autotrim_core::parse_color)
        .transpose()
        .map_err(|e| format!("Error parsing --padding: {e}"))?;

    Ok(TrimConfig {
        limit: cli.limit,
        mode: match cli.mode {
            Mode::Neighbor => EdgeMode::Neighbor,
            Mode::Border => EdgeMode::Border,
        },
        margin: cli.margin,
        padding: padding.map(|p| p.0),
        backend: match cli.backend {
            Backend::Scalar => ComputeBackend::Scalar,
            Backend::Parallel => ComputeBackend::Parallel,
            Backend::Gpu => ComputeBackend::Gpu,
        },
    })
}

/// Install the stderr log subscriber.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// What `--json` prints.
#[derive(Serialize)]
struct Report<'a> {
    input: &'a Path,
    width: u32,
    height: u32,
    detected: Rectangle,
    crop: Rectangle,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    runs: Vec<TrimDiagnostics>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.input) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.input.display());
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        input = %cli.input.display(),
        bytes = image_bytes.len(),
        ?config,
        "starting"
    );

    let pending =
        Pipeline::new(image_bytes.clone(), config.clone()).keep_edge_map(cli.edge_map.is_some());
    let mut all_diagnostics = Vec::new();
    let outcome = match cli.output {
        Some(ref output_path) => crop_runs(
            &cli,
            output_path,
            pending,
            &image_bytes,
            &config,
            &mut all_diagnostics,
        ),
        None => detect_only(&cli, pending),
    };
    let detection = match outcome {
        Ok(d) => d,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        let report = Report {
            input: &cli.input,
            width: detection.width,
            height: detection.height,
            detected: detection.detected,
            crop: detection.crop,
            runs: all_diagnostics,
        };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing report: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_rect("detected", detection.detected);
        print_rect("crop", detection.crop);
        if all_diagnostics.len() > 1 {
            print_multi_run_summary(&all_diagnostics);
        }
    }

    ExitCode::SUCCESS
}

/// Source size and rectangles reported at the end of a run.
struct Detection {
    width: u32,
    height: u32,
    detected: Rectangle,
    crop: Rectangle,
}

/// Decode, scan and threshold, stopping before the crop.
fn detect_only(cli: &Cli, pending: Pending) -> Result<Detection, String> {
    let margins = pending
        .decode()
        .and_then(Decoded::detect_edges)
        .and_then(EdgesDetected::find_margins)
        .map_err(|e| format!("Detection failed: {e}"))?;
    write_previews(
        cli,
        margins.original(),
        margins.edge_map(),
        margins.crop_rect(),
    )?;
    Ok(Detection {
        width: margins.original().width(),
        height: margins.original().height(),
        detected: margins.detected(),
        crop: margins.crop_rect(),
    })
}

/// Crop `cli.runs` times. The first run feeds the previews and the
/// output file; later runs only add timings.
fn crop_runs(
    cli: &Cli,
    output_path: &Path,
    pending: Pending,
    image_bytes: &[u8],
    config: &TrimConfig,
    all_diagnostics: &mut Vec<TrimDiagnostics>,
) -> Result<Detection, String> {
    let (cropped, diagnostics) =
        run_with_diagnostics(pending, &StdClock).map_err(|e| format!("Trim failed: {e}"))?;
    write_previews(
        cli,
        cropped.original(),
        cropped.edge_map(),
        cropped.crop_rect(),
    )?;

    let output = cropped.output();
    output
        .save(output_path)
        .map_err(|e| format!("Error writing {}: {e}", output_path.display()))?;
    eprintln!(
        "Cropped image written to {} ({}x{})",
        output_path.display(),
        output.width(),
        output.height(),
    );
    let detection = Detection {
        width: cropped.original().width(),
        height: cropped.original().height(),
        detected: cropped.detected(),
        crop: cropped.crop_rect(),
    };

    if !cli.json {
        eprintln!("{}", diagnostics.report());
    }
    all_diagnostics.push(diagnostics);

    for _ in 1..cli.runs {
        let (_, diagnostics) = process_with_diagnostics(image_bytes, config, &StdClock)
            .map_err(|e| format!("Trim failed: {e}"))?;
        if !cli.json {
            eprintln!("{}", diagnostics.report());
        }
        all_diagnostics.push(diagnostics);
    }
    Ok(detection)
}

/// Write `--overlay` and `--edge-map` images, when requested.
fn write_previews(
    cli: &Cli,
    original: &RgbaImage,
    edge_map: Option<&RgbaImage>,
    crop: Rectangle,
) -> Result<(), String> {
    if let Some(ref path) = cli.overlay {
        let annotated = autotrim_core::overlay::draw_bounds(
            original,
            crop,
            autotrim_core::overlay::DEFAULT_OUTLINE,
            OVERLAY_THICKNESS,
        );
        annotated
            .save(path)
            .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        eprintln!("Overlay written to {}", path.display());
    }

    if let Some(ref path) = cli.edge_map {
        let map = edge_map.ok_or_else(|| "Edge map was not retained".to_string())?;
        autotrim_core::edge_strength_image(map)
            .save(path)
            .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        eprintln!("Edge map written to {}", path.display());
    }
    Ok(())
}

fn print_rect(label: &str, r: Rectangle) {
    println!(
        "{label}: left={} top={} right={} bottom={} ({}x{})",
        r.left,
        r.top,
        r.right,
        r.bottom,
        r.width(),
        r.height(),
    );
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&TrimDiagnostics) -> Duration;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[TrimDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();
    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;
    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Decode", |d| d.decode.duration),
        ("Edge Detection", |d| d.edge_detection.duration),
        ("Margins", |d| d.margins.duration),
        ("Crop", |d| d.crop.duration),
    ];
    for (name, extractor) in stage_extractors {
        let total: f64 = all_diagnostics
            .iter()
            .map(|d| extractor(d).as_secs_f64() * 1000.0)
            .sum();
        let stage_mean = total / all_diagnostics.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
