use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use geo_types::{Rect, coord};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::{DEFAULT_DIGITS, DEFAULT_TOLERANCE, FailurePolicy, RenameTable, SettingsFile};
use crate::pipeline::{ConversionOptions, ConversionReport, convert};
use crate::sinks::{DataSink, GeoJsonSink, GeoJsonlSink};
use crate::source::load_source;
use crate::temporal::{ValidityFields, YearWindows};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input dataset (.shp or .geojson)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file (.json, .geojson, .geojsonl), or - for stdout
    #[arg(short, long)]
    pub output: PathBuf,

    /// Settings file (YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Simplification distance tolerance in source units (default: 0.001)
    #[arg(short, long, env = "HISTOMAP_TOLERANCE")]
    pub tolerance: Option<f64>,

    /// Decimal digits kept after precision reduction (default: 3)
    #[arg(short, long, env = "HISTOMAP_DIGITS")]
    pub digits: Option<u32>,

    /// Emit one snapshot layer per year, as START:END:STEP
    #[arg(long)]
    pub years: Option<YearWindows>,

    /// Only convert records whose bounding box intersects MINX,MINY,MAXX,MAXY
    #[arg(long)]
    pub bbox: Option<BoundsArg>,

    /// Per-feature failure handling: skip or fail-fast
    #[arg(long)]
    pub failure_policy: Option<FailurePolicy>,

    /// Number of threads (default: all cores)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output format (auto-detected if omitted)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum OutputFormat {
    #[value(name = "geojson", alias = "json")]
    GeoJson,
    #[value(name = "geojsonl", alias = "jsonl")]
    GeoJsonl,
}

impl OutputFormat {
    pub fn label(&self) -> &'static str {
        match self {
            OutputFormat::GeoJson => "geojson",
            OutputFormat::GeoJsonl => "geojsonl",
        }
    }

    pub fn detect(output: &Path) -> Option<Self> {
        let ext = output.extension()?.to_str()?;
        match ext.to_lowercase().as_str() {
            "geojson" | "json" => Some(OutputFormat::GeoJson),
            "geojsonl" | "jsonl" => Some(OutputFormat::GeoJsonl),
            _ => None,
        }
    }
}

/// Query rectangle given on the command line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsArg(pub Rect<f64>);

impl FromStr for BoundsArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let numbers = value
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|err| format!("invalid bbox {value}: {err}"))?;
        let [min_x, min_y, max_x, max_y] = numbers.as_slice() else {
            return Err(format!("expected MINX,MINY,MAXX,MAXY, got: {value}"));
        };
        Ok(BoundsArg(Rect::new(
            coord! { x: *min_x, y: *min_y },
            coord! { x: *max_x, y: *max_y },
        )))
    }
}

/// Merges the optional settings file with command-line overrides.
pub fn resolve_options(cli: &Cli) -> Result<(ConversionOptions, RenameTable)> {
    let settings = match &cli.config {
        Some(path) => SettingsFile::load(path)
            .with_context(|| format!("Config: Failed to load settings from {:?}", path))?,
        None => SettingsFile::default(),
    };

    let mut renames = RenameTable::legacy();
    renames.extend(&settings.renames);

    let defaults = ValidityFields::default();
    let options = ConversionOptions {
        tolerance: cli
            .tolerance
            .or(settings.tolerance)
            .unwrap_or(DEFAULT_TOLERANCE),
        digits: cli.digits.or(settings.digits).unwrap_or(DEFAULT_DIGITS),
        windows: cli.years.or(settings.windows),
        validity: ValidityFields {
            from: settings.valid_from_field.unwrap_or(defaults.from),
            to: settings.valid_to_field.unwrap_or(defaults.to),
        },
        failure_policy: cli
            .failure_policy
            .or(settings.failure_policy)
            .unwrap_or_default(),
    };
    options.validate()?;
    Ok((options, renames))
}

pub fn init_sink(format: &OutputFormat, output: &Path) -> Result<Box<dyn DataSink + Send>> {
    let to_stdout = output == Path::new("-");
    if to_stdout {
        tracing::info!("Sink: {} -> stdout", format.label());
    } else {
        tracing::info!("Sink: {} -> {:?}", format.label(), output);
    }
    let sink: Box<dyn DataSink + Send> = match (format, to_stdout) {
        (OutputFormat::GeoJson, true) => Box::new(GeoJsonSink::stdout()?),
        (OutputFormat::GeoJson, false) => Box::new(
            GeoJsonSink::new(output)
                .with_context(|| format!("Sink: Failed to create {:?}", output))?,
        ),
        (OutputFormat::GeoJsonl, true) => Box::new(GeoJsonlSink::stdout()?),
        (OutputFormat::GeoJsonl, false) => Box::new(
            GeoJsonlSink::new(output)
                .with_context(|| format!("Sink: Failed to create {:?}", output))?,
        ),
    };
    Ok(sink)
}

/// A conversion that stopped early must not leave a truncated collection behind.
fn discard_partial_output(output: &Path) {
    if output == Path::new("-") {
        return;
    }
    if let Err(err) = std::fs::remove_file(output) {
        tracing::warn!("Sink: Could not remove partial output {:?}: {}", output, err);
    } else {
        tracing::info!("Sink: Removed partial output {:?}", output);
    }
}

/// One conversion: load, convert, finish the sink.
pub fn run(cli: &Cli) -> Result<ConversionReport> {
    let (options, renames) = resolve_options(cli)?;
    tracing::info!(
        "Options: tolerance {}, digits {}, windows {:?}, policy {:?}",
        options.tolerance,
        options.digits,
        options.windows,
        options.failure_policy
    );

    let format = cli
        .format
        .or_else(|| OutputFormat::detect(&cli.output))
        .context("CLI: Could not detect output format from extension; use --format")?;

    let query = cli.bbox.map(|bounds| bounds.0);
    let dataset = load_source(&cli.input, &renames, query.as_ref())
        .with_context(|| format!("Source: Failed to read {:?}", cli.input))?;

    let mut sink = init_sink(&format, &cli.output)?;
    let report = match convert(&dataset.features, &options, sink.as_mut()) {
        Ok(report) => report,
        Err(err) => {
            drop(sink);
            discard_partial_output(&cli.output);
            return Err(err);
        }
    };
    sink.finish().context("Pipeline: Failed to finalize sink")?;

    if report.skipped > 0 {
        tracing::warn!("{} features skipped", report.skipped);
    }
    Ok(report)
}
