//! Raw samples to per-size summary statistics.

use std::collections::BTreeMap;

use crate::schema::{Sample, SummaryRow, BYTES_PER_MIB};

/// Groups samples by size and reduces each group to mean, population stdev
/// and throughput. Rows come out ascending by size.
///
/// The result depends only on the multiset of samples: each group is sorted
/// before summation, so any permutation of `samples` gives bit-identical rows.
pub fn summarize(samples: &[Sample]) -> Vec<SummaryRow> {
    let mut by_size: BTreeMap<u64, Vec<f64>> = BTreeMap::new();
    for s in samples {
        by_size
            .entry(s.size_bytes)
            .or_default()
            .push(s.seconds_per_sign);
    }

    by_size
        .into_iter()
        .map(|(size_bytes, mut per_sign)| {
            per_sign.sort_by(f64::total_cmp);
            let (mean, stdev) = mean_pstdev(&per_sign);
            SummaryRow {
                size_bytes,
                samples: per_sign.len(),
                mean_seconds_per_sign: mean,
                stdev_seconds_per_sign: stdev,
                throughput_mb_per_s: throughput_mb_per_s(size_bytes, mean),
            }
        })
        .collect()
}

/// Mean and population standard deviation; stdev is 0 below two values.
pub fn mean_pstdev(xs: &[f64]) -> (f64, f64) {
    let n = xs.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = xs.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, 0.0);
    }
    let var = xs.iter().map(|&x| (x - mean) * (x - mean)).sum::<f64>() / n as f64;
    (mean, var.sqrt())
}

pub fn throughput_mb_per_s(size_bytes: u64, mean_seconds: f64) -> f64 {
    (size_bytes as f64 / BYTES_PER_MIB) / mean_seconds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::render_summary;

    fn sample(size: u64, run: u32, per_sign: f64) -> Sample {
        Sample::new(size, run, 1, per_sign)
    }

    #[test]
    fn test_reference_scenario() {
        let samples = [
            sample(4096, 1, 0.0010),
            sample(4096, 2, 0.0012),
            sample(4096, 3, 0.0011),
        ];
        let rows = summarize(&samples);
        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(r.samples, 3);
        assert!((r.mean_seconds_per_sign - 0.0011).abs() < 1e-12);
        assert!((r.stdev_seconds_per_sign - 0.000_081_649_658).abs() < 1e-10);
        assert!((r.throughput_mb_per_s - 3.551_136_36).abs() < 1e-6);
    }

    #[test]
    fn test_single_sample_has_zero_stdev() {
        let rows = summarize(&[sample(65536, 1, 0.02)]);
        assert_eq!(rows[0].samples, 1);
        assert_eq!(rows[0].stdev_seconds_per_sign, 0.0);
    }

    #[test]
    fn test_throughput_matches_definition() {
        let samples = [
            sample(1048576, 1, 0.5),
            sample(1048576, 2, 0.25),
            sample(4194304, 1, 1.0),
        ];
        for r in summarize(&samples) {
            let expected = (r.size_bytes as f64 / 1048576.0) / r.mean_seconds_per_sign;
            assert!((r.throughput_mb_per_s - expected).abs() <= 1e-12 * expected);
        }
    }

    #[test]
    fn test_rows_sorted_one_per_size_any_order() {
        let mut samples = vec![
            sample(134217728, 1, 1.3),
            sample(4096, 1, 0.001),
            sample(65536, 1, 0.002),
            sample(4096, 2, 0.0013),
            sample(134217728, 2, 1.1),
            sample(65536, 2, 0.0021),
            sample(4096, 3, 0.0017),
        ];
        let forward = summarize(&samples);
        let sizes: Vec<u64> = forward.iter().map(|r| r.size_bytes).collect();
        assert_eq!(sizes, vec![4096, 65536, 134217728]);

        samples.reverse();
        let reversed = summarize(&samples);
        samples.rotate_left(3);
        let rotated = summarize(&samples);

        assert_eq!(render_summary(&forward), render_summary(&reversed));
        assert_eq!(render_summary(&forward), render_summary(&rotated));
    }

    #[test]
    fn test_idempotent() {
        let samples = [sample(8192, 1, 0.003), sample(8192, 2, 0.0031)];
        assert_eq!(summarize(&samples), summarize(&samples));
    }

    #[test]
    fn test_population_not_sample_stdev() {
        let (_, sd) = mean_pstdev(&[1.0, 3.0]);
        assert_eq!(sd, 1.0);
    }
}
