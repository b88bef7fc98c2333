//! The linear benchmark pipeline: prepare, time, store, aggregate, plot.
//!
//! Every stage runs to completion before the next starts, and the first error
//! ends the whole pipeline.

use log::{info, warn};

use crate::aggregate::summarize;
use crate::dataset::{read_raw, read_summary, write_summary, OutputLayout, RawSampleWriter};
use crate::error::{BenchError, Result};
use crate::fixture::prepare_payload;
use crate::harness::{measure_fn, BenchRng, BenchmarkPlan, WARMUP_VERSION};
use crate::plot::{plot_mean_time, plot_throughput};
use crate::schema::{Sample, SummaryRow};
use crate::signer::ExternalSigner;

/// Times every size class of `plan`, writing the raw dataset as it goes.
///
/// The raw dataset is truncated first. Each run's row is written as soon as
/// the run ends and the file is fsynced after each size class. An abort keeps
/// every finished size class plus the completed runs of the interrupted one,
/// so a later aggregation can see that size with fewer samples than the rest.
pub fn run_timing(
    plan: &BenchmarkPlan,
    layout: &OutputLayout,
    rng: &mut BenchRng,
    signer: &mut dyn ExternalSigner,
) -> Result<Vec<Sample>> {
    plan.validate()?;
    let mut store = RawSampleWriter::create(&layout.raw_csv())?;
    let mut samples = Vec::new();

    for &size in &plan.sizes {
        let payload = layout.payload(size);
        let header = layout.header(size);
        prepare_payload(&payload, size, rng)?;

        if plan.warmup {
            signer.sign(&payload, &header, size, WARMUP_VERSION)?;
        }

        for run in 1..=plan.reps {
            let versions = rng.versions(plan.iters);
            let m = measure_fn(plan.iters, |i| {
                signer.sign(&payload, &header, size, versions[i])
            })?;

            let sample = Sample::new(size, run, m.iters, m.total.as_secs_f64());
            info!(
                "size={} run={}/{} iters={} total={:.3}s per={:.3}ms",
                size,
                run,
                plan.reps,
                m.iters,
                sample.seconds_total,
                sample.seconds_per_sign * 1e3
            );
            store.append(&sample)?;
            samples.push(sample);
        }
        store.sync()?;
    }

    info!("wrote {}", store.path().display());
    Ok(samples)
}

/// Rebuilds the summary dataset from the complete raw dataset.
///
/// Nothing is written if the raw dataset is missing or invalid.
pub fn run_aggregate(layout: &OutputLayout) -> Result<Vec<SummaryRow>> {
    let raw_path = layout.raw_csv();
    let samples = read_raw(&raw_path)?;
    if samples.is_empty() {
        return Err(BenchError::data_format(
            &raw_path,
            "raw dataset has no samples",
        ));
    }
    let rows = summarize(&samples);
    for r in undersampled(&rows) {
        warn!(
            "size {} has only {} samples; its run was probably interrupted",
            r.size_bytes, r.samples
        );
    }
    let summary_path = layout.summary_csv();
    write_summary(&summary_path, &rows)?;
    info!("wrote {} ({} sizes)", summary_path.display(), rows.len());
    Ok(rows)
}

/// Rows with fewer samples than the best-sampled size.
pub fn undersampled(rows: &[SummaryRow]) -> Vec<&SummaryRow> {
    let most = rows.iter().map(|r| r.samples).max().unwrap_or(0);
    rows.iter().filter(|r| r.samples < most).collect()
}

pub fn run_plots(layout: &OutputLayout, rows: &[SummaryRow]) -> Result<()> {
    plot_mean_time(rows, &layout.plot_mean())?;
    plot_throughput(rows, &layout.plot_throughput())
}

/// Plots from an existing summary dataset.
pub fn run_plots_from_summary(layout: &OutputLayout) -> Result<()> {
    let rows = read_summary(&layout.summary_csv())?;
    run_plots(layout, &rows)
}
