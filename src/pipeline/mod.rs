//! The per-feature conversion pipeline.
//!
//! Every selected feature runs enrich → simplify → reduce. When reduction
//! collapses the geometry the simplified geometry is kept instead, so precision
//! loss never removes a feature from the output. The per-feature work runs on
//! the rayon pool; rows reach the sink in source order (or window-major,
//! source-minor order when windowing).

use anyhow::{Result, anyhow};
use rayon::prelude::*;

use crate::config::FailurePolicy;
use crate::enrich::enrich;
use crate::error::FeatureError;
use crate::geometry::{Reduced, ensure_well_formed, reduce, simplify};
use crate::sinks::{DataSink, FeatureRow};
use crate::source::SourceFeature;
use crate::temporal::{ValidityFields, YearWindows};

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOptions {
    pub tolerance: f64,
    pub digits: u32,
    pub windows: Option<YearWindows>,
    pub validity: ValidityFields,
    pub failure_policy: FailurePolicy,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            tolerance: crate::config::DEFAULT_TOLERANCE,
            digits: crate::config::DEFAULT_DIGITS,
            windows: None,
            validity: ValidityFields::default(),
            failure_policy: FailurePolicy::Skip,
        }
    }
}

impl ConversionOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            anyhow::bail!(
                "Config: tolerance must be a non-negative number, got {}",
                self.tolerance
            );
        }
        if let Some(windows) = &self.windows
            && windows.step == 0
        {
            anyhow::bail!("Config: window step must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConversionReport {
    pub written: u64,
    pub skipped: u64,
    /// Features whose reduced geometry collapsed and were written unreduced.
    pub unreduced: u64,
    pub windows: usize,
}

/// Output of one feature before it reaches the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedFeature {
    pub row: FeatureRow,
    pub reduced: bool,
}

pub fn process_feature(
    feature: &SourceFeature,
    options: &ConversionOptions,
) -> Result<ProcessedFeature, FeatureError> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or(FeatureError::MalformedGeometry("record has no geometry"))?;
    ensure_well_formed(geometry)?;

    let enrichment = enrich(feature)?;
    let simplified = simplify(geometry, options.tolerance)?;
    let (geometry, reduced) = match reduce(&simplified, options.digits)? {
        Reduced::Snapped(reduced) => (reduced, true),
        Reduced::Degenerate => (simplified, false),
    };

    let mut properties = feature.attributes.clone();
    enrichment.write_into(&mut properties);

    Ok(ProcessedFeature {
        row: FeatureRow {
            geometry,
            properties,
        },
        reduced,
    })
}

/// Indices of the features valid at `instant`, in source order.
pub fn select_window(
    features: &[SourceFeature],
    validity: &ValidityFields,
    instant: &str,
) -> Vec<usize> {
    features
        .iter()
        .enumerate()
        .filter(|(_, f)| validity.is_valid_at(&f.attributes, instant))
        .map(|(index, _)| index)
        .collect()
}

pub fn convert(
    features: &[SourceFeature],
    options: &ConversionOptions,
    sink: &mut dyn DataSink,
) -> Result<ConversionReport> {
    options.validate()?;
    let mut report = ConversionReport::default();

    match &options.windows {
        None => {
            let all: Vec<usize> = (0..features.len()).collect();
            write_batch(features, &all, options, sink, &mut report)?;
        }
        Some(windows) => {
            for instant in windows.instants() {
                let selected = select_window(features, &options.validity, &instant);
                tracing::info!("Window {}: {} features", instant, selected.len());
                write_batch(features, &selected, options, sink, &mut report)?;
                report.windows += 1;
            }
        }
    }

    Ok(report)
}

fn write_batch(
    features: &[SourceFeature],
    selected: &[usize],
    options: &ConversionOptions,
    sink: &mut dyn DataSink,
    report: &mut ConversionReport,
) -> Result<()> {
    let results: Vec<(usize, Result<ProcessedFeature, FeatureError>)> = selected
        .par_iter()
        .map(|&index| (index, process_feature(&features[index], options)))
        .collect();

    for (index, result) in results {
        match result {
            Ok(processed) => {
                if !processed.reduced {
                    tracing::debug!(
                        "Feature {}: precision reduction collapsed geometry, keeping simplified",
                        index
                    );
                    report.unreduced += 1;
                }
                sink.add_feature(processed.row)?;
                report.written += 1;
            }
            Err(err) => match options.failure_policy {
                FailurePolicy::Skip => {
                    tracing::warn!("Feature {}: skipped: {}", index, err);
                    report.skipped += 1;
                }
                FailurePolicy::FailFast => {
                    return Err(anyhow!("Pipeline: feature {} failed: {}", index, err));
                }
            },
        }
    }
    Ok(())
}
