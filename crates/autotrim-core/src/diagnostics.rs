//! Trim diagnostics: timing and per-stage metrics.
//!
//! Used for threshold tuning and for comparing compute backends.
//! [`process_with_diagnostics`] drives the staged [`Pipeline`] and
//! records how long each transition took alongside what it produced.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::aggregate::EdgeStrength;
use crate::pipeline::{Cropped, Pending, Pipeline, PipelineStage};
use crate::rect::Rectangle;
use crate::types::{TrimConfig, TrimError, TrimResult};

/// Time source for stage measurements.
///
/// The core crate stays free of platform clocks; callers supply one
/// (the CLI uses `std::time::Instant`).
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// Current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single trim run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrimDiagnostics {
    /// Image decoding.
    pub decode: StageDiagnostics,
    /// Edge scan and aggregation.
    pub edge_detection: StageDiagnostics,
    /// Threshold scan.
    pub margins: StageDiagnostics,
    /// Crop and pad.
    pub crop: StageDiagnostics,
    /// Wall-clock duration of the whole run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary across all stages.
    pub summary: TrimSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding.
    Decode {
        /// Size of the encoded input.
        input_bytes: usize,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
        /// `width * height`.
        pixel_count: u64,
    },
    /// Edge scan.
    EdgeDetection {
        /// Comparison mode.
        mode: String,
        /// Backend the scan ran on.
        backend: String,
        /// Strongest edge seen in each direction.
        peak: EdgeStrength,
    },
    /// Threshold scan.
    Margins {
        /// Threshold in effect.
        limit: i32,
        /// Margin added around the detection.
        margin: i32,
        /// Rectangle found by the scan.
        detected: Rectangle,
        /// Rectangle after applying the margin.
        crop: Rectangle,
    },
    /// Crop and pad.
    Crop {
        /// Output width in pixels.
        width: u32,
        /// Output height in pixels.
        height: u32,
        /// Output pixels filled with padding rather than source.
        padded_pixels: u64,
    },
}

/// High-level summary for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrimSummary {
    /// Source width in pixels.
    pub image_width: u32,
    /// Source height in pixels.
    pub image_height: u32,
    /// Content rectangle found.
    pub detected: Rectangle,
    /// Output width in pixels.
    pub output_width: u32,
    /// Output height in pixels.
    pub output_height: u32,
}

impl TrimDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Trim Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{}  ->  {}x{}",
            self.summary.image_width,
            self.summary.image_height,
            self.summary.output_width,
            self.summary.output_height,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Decode", &self.decode),
            ("Edge Detection", &self.edge_detection),
            ("Margins", &self.margins),
            ("Crop", &self.crop),
        ];
        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        let d = self.summary.detected;
        lines.push(format!(
            "Detected: left={} top={} right={} bottom={}",
            d.left, d.top, d.right, d.bottom,
        ));

        lines.join("\n")
    }
}

/// Run a full trim, timing each stage with `clock`.
///
/// # Errors
///
/// Fails with the same errors as [`crate::trim`].
pub fn process_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &TrimConfig,
    clock: &C,
) -> Result<(TrimResult, TrimDiagnostics), TrimError> {
    let pending = Pipeline::new(image_bytes.to_vec(), config.clone());
    let (cropped, diagnostics) = run_with_diagnostics(pending, clock)?;
    Ok((cropped.into_result(), diagnostics))
}

/// Drive a [`Pending`] pipeline to the end, timing each stage.
///
/// Returns the final stage so callers can still reach the decoded
/// source, the edge map (if retained) and the rectangles.
///
/// # Errors
///
/// Fails with the same errors as [`crate::trim`].
pub fn run_with_diagnostics<C: Clock>(
    pending: Pending,
    clock: &C,
) -> Result<(Cropped, TrimDiagnostics), TrimError> {
    let start = clock.now();

    let t = clock.now();
    let decoded = pending.decode()?;
    let decode = timed(clock.elapsed(&t), &decoded)?;

    let t = clock.now();
    let edges = decoded.detect_edges()?;
    let edge_detection = timed(clock.elapsed(&t), &edges)?;

    let t = clock.now();
    let margins = edges.find_margins()?;
    let margins_diag = timed(clock.elapsed(&t), &margins)?;

    let t = clock.now();
    let cropped = margins.crop()?;
    let crop = timed(clock.elapsed(&t), &cropped)?;

    let total_duration = clock.elapsed(&start);

    let summary = TrimSummary {
        image_width: cropped.original().width(),
        image_height: cropped.original().height(),
        detected: cropped.detected(),
        output_width: cropped.output().width(),
        output_height: cropped.output().height(),
    };
    tracing::info!(
        total_ms = duration_ms(total_duration),
        detected = ?cropped.detected(),
        "trim finished"
    );

    Ok((
        cropped,
        TrimDiagnostics {
            decode,
            edge_detection,
            margins: margins_diag,
            crop,
            total_duration,
            summary,
        },
    ))
}

fn timed<S: PipelineStage>(duration: Duration, stage: &S) -> Result<StageDiagnostics, TrimError> {
    let metrics = stage.metrics().ok_or_else(|| {
        TrimError::InvalidConfig(format!("stage {} produced no metrics", S::NAME))
    })?;
    Ok(StageDiagnostics { duration, metrics })
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::EdgeDetection {
            mode,
            backend,
            peak,
        } => format!(
            "{mode}/{backend} peak up={} down={} left={} right={}",
            peak.up, peak.down, peak.left, peak.right,
        ),
        StageMetrics::Margins {
            limit,
            margin,
            detected,
            crop,
        } => format!(
            "limit={limit} margin={margin} {}x{} -> {}x{}",
            detected.width(),
            detected.height(),
            crop.width(),
            crop.height(),
        ),
        StageMetrics::Crop {
            width,
            height,
            padded_pixels,
        } => format!("{width}x{height} ({padded_pixels} padded)"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use image::Rgba;

    use super::*;
    use crate::types::RgbaImage;

    /// Clock that advances one millisecond per reading.
    struct StepClock(Cell<u64>);

    impl Clock for StepClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get();
            self.0.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.0.get().saturating_sub(*since))
        }
    }

    fn square_png() -> Vec<u8> {
        let mut img = RgbaImage::from_pixel(30, 20, Rgba([200, 200, 200, 255]));
        for y in 5..15 {
            for x in 10..20 {
                img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        crate::decode::encode_png(&img).unwrap()
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let ms = duration_ms(Duration::from_millis(1234));
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn diagnostics_cover_every_stage() {
        let clock = StepClock(Cell::new(0));
        let (result, diag) =
            process_with_diagnostics(&square_png(), &TrimConfig::default(), &clock).unwrap();
        assert_eq!(result.detected, Rectangle::new(10, 5, 20, 15));
        assert_eq!(diag.summary.detected, result.detected);
        assert_eq!((diag.summary.output_width, diag.summary.output_height), (10, 10));
        assert!(matches!(
            diag.decode.metrics,
            StageMetrics::Decode {
                width: 30,
                height: 20,
                ..
            }
        ));
        assert!(matches!(
            diag.crop.metrics,
            StageMetrics::Crop {
                padded_pixels: 0,
                ..
            }
        ));
        assert!(diag.total_duration >= diag.decode.duration);
        assert!(diag.total_duration > Duration::ZERO);
    }

    #[test]
    fn errors_propagate() {
        let clock = StepClock(Cell::new(0));
        let result = process_with_diagnostics(&[], &TrimConfig::default(), &clock);
        assert!(matches!(result, Err(TrimError::EmptyInput)));

        let config = TrimConfig {
            margin: i32::MIN,
            ..TrimConfig::default()
        };
        let result = process_with_diagnostics(&square_png(), &config, &clock);
        assert!(matches!(result, Err(TrimError::InvalidConfig(_))));
    }

    #[test]
    fn staged_run_keeps_intermediates() {
        let clock = StepClock(Cell::new(0));
        let pending = Pipeline::new(square_png(), TrimConfig::default()).keep_edge_map(true);
        let (cropped, diag) = run_with_diagnostics(pending, &clock).unwrap();
        assert_eq!(cropped.original().dimensions(), (30, 20));
        assert_eq!(cropped.edge_map().unwrap().dimensions(), (30, 20));
        assert_eq!(cropped.crop_rect(), Rectangle::new(10, 5, 20, 15));
        assert_eq!(diag.summary.detected, cropped.detected());
    }

    #[test]
    fn report_and_json() {
        let clock = StepClock(Cell::new(0));
        let (_, diag) =
            process_with_diagnostics(&square_png(), &TrimConfig::default(), &clock).unwrap();
        let report = diag.report();
        assert!(report.contains("Trim Diagnostics Report"));
        assert!(report.contains("Edge Detection"));
        assert!(report.contains("neighbor/parallel"));
        assert!(report.contains("left=10 top=5 right=20 bottom=15"));

        let json = serde_json::to_string(&diag).unwrap();
        let back: TrimDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.crop.metrics, diag.crop.metrics);
        let drift = back.total_duration.abs_diff(diag.total_duration);
        assert!(drift < Duration::from_micros(1));
    }
}
