//! On-disk datasets and the output directory layout.
//!
//! # Raw dataset (`sign_times_raw.csv`)
//!
//! ```text
//! size_bytes,run,iters,seconds_total,seconds_per_sign
//! 4096,1,50,0.412345678,0.008246914
//! ```
//!
//! Truncated once per timing run, then appended one row per sample. Seconds
//! carry nine decimals (nanosecond resolution).
//!
//! # Summary dataset (`sign_times_summary.csv`)
//!
//! ```text
//! size_bytes,samples,mean_seconds_per_sign,stdev_seconds_per_sign,throughput_MB_per_s
//! ```
//!
//! Rewritten wholesale on every aggregation through a temp file + rename.
//! Floats use shortest round-trip formatting so identical rows render to
//! identical bytes.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tempfile::NamedTempFile;

use crate::error::{BenchError, Result};
use crate::schema::{RunMeta, Sample, SummaryRow};

pub const RAW_HEADER: &str = "size_bytes,run,iters,seconds_total,seconds_per_sign";

pub const SUMMARY_HEADER: &str =
    "size_bytes,samples,mean_seconds_per_sign,stdev_seconds_per_sign,throughput_MB_per_s";

/// Absolute slack allowed between `seconds_per_sign` and `seconds_total / iters`
/// after both went through nine-decimal formatting.
const PER_SIGN_TOLERANCE: f64 = 2e-9;

/// File names inside the output directory.
#[derive(Clone, Debug)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| BenchError::fixture(&self.root, e))
    }

    pub fn public_key(&self) -> PathBuf {
        self.root.join("pub.key")
    }

    pub fn secret_key(&self) -> PathBuf {
        self.root.join("sec.key")
    }

    pub fn payload(&self, size_bytes: u64) -> PathBuf {
        self.root.join(format!("payload_{size_bytes}.bin"))
    }

    pub fn header(&self, size_bytes: u64) -> PathBuf {
        self.root.join(format!("hdr_{size_bytes}.bin"))
    }

    pub fn raw_csv(&self) -> PathBuf {
        self.root.join("sign_times_raw.csv")
    }

    pub fn summary_csv(&self) -> PathBuf {
        self.root.join("sign_times_summary.csv")
    }

    pub fn run_meta(&self) -> PathBuf {
        self.root.join("run_meta.json")
    }

    pub fn plot_mean(&self) -> PathBuf {
        self.root.join("plot_mean_ms.svg")
    }

    pub fn plot_throughput(&self) -> PathBuf {
        self.root.join("plot_throughput_mb_s.svg")
    }
}

/// Append-only writer for the raw dataset.
pub struct RawSampleWriter {
    path: PathBuf,
    out: BufWriter<File>,
}

impl RawSampleWriter {
    /// Truncates `path` and writes the header.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| BenchError::store(path, e))?;
        let mut w = Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
        };
        w.write_line(RAW_HEADER)?;
        w.sync()?;
        Ok(w)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes one row and hands it to the OS.
    pub fn append(&mut self, s: &Sample) -> Result<()> {
        let line = format!(
            "{},{},{},{:.9},{:.9}",
            s.size_bytes, s.run, s.iters, s.seconds_total, s.seconds_per_sign
        );
        self.write_line(&line)?;
        self.out
            .flush()
            .map_err(|e| BenchError::store(&self.path, e))
    }

    /// Flushes and fsyncs everything appended so far.
    pub fn sync(&mut self) -> Result<()> {
        self.out
            .flush()
            .map_err(|e| BenchError::store(&self.path, e))?;
        self.out
            .get_ref()
            .sync_data()
            .map_err(|e| BenchError::store(&self.path, e))
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{line}").map_err(|e| BenchError::store(&self.path, e))
    }
}

fn read_lines(path: &Path, what: &str) -> Result<Vec<String>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(BenchError::data_format(
                path,
                format!("{what} dataset not found"),
            ));
        }
        Err(e) => return Err(BenchError::data_format(path, e.to_string())),
    };
    BufReader::new(file)
        .lines()
        .collect::<io::Result<Vec<_>>>()
        .map_err(|e| BenchError::data_format(path, e.to_string()))
}

/// Splits the header off and checks it; yields `(line_no, fields)` for data rows.
fn data_rows<'a>(
    path: &Path,
    lines: &'a [String],
    header: &str,
    width: usize,
) -> Result<Vec<(usize, Vec<&'a str>)>> {
    let first = lines
        .first()
        .ok_or_else(|| BenchError::data_format(path, "empty file"))?;
    if first.trim() != header {
        return Err(BenchError::data_format(
            path,
            format!("unexpected header {first:?}"),
        ));
    }

    let mut out = Vec::new();
    for (idx, line) in lines.iter().enumerate().skip(1) {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != width {
            return Err(BenchError::data_format(
                path,
                format!(
                    "line {line_no}: expected {width} fields, found {}",
                    fields.len()
                ),
            ));
        }
        out.push((line_no, fields));
    }
    Ok(out)
}

fn parse_field<T: FromStr>(path: &Path, line_no: usize, name: &str, raw: &str) -> Result<T> {
    raw.parse().map_err(|_| {
        let reason = format!("line {line_no}: bad {name} {raw:?}");
        BenchError::data_format(path, reason)
    })
}

fn positive_seconds(path: &Path, line_no: usize, name: &str, raw: &str) -> Result<f64> {
    let v: f64 = parse_field(path, line_no, name, raw)?;
    if !v.is_finite() || v <= 0.0 {
        return Err(BenchError::data_format(
            path,
            format!("line {line_no}: {name} must be finite and positive, got {raw}"),
        ));
    }
    Ok(v)
}

/// Loads and validates every row of a raw dataset.
pub fn read_raw(path: &Path) -> Result<Vec<Sample>> {
    let lines = read_lines(path, "raw")?;
    let rows = data_rows(path, &lines, RAW_HEADER, 5)?;

    let mut samples = Vec::with_capacity(rows.len());
    for (line_no, f) in rows {
        let size_bytes: u64 = parse_field(path, line_no, "size_bytes", f[0])?;
        let run: u32 = parse_field(path, line_no, "run", f[1])?;
        let iters: u32 = parse_field(path, line_no, "iters", f[2])?;
        let seconds_total = positive_seconds(path, line_no, "seconds_total", f[3])?;
        let seconds_per_sign = positive_seconds(path, line_no, "seconds_per_sign", f[4])?;

        if size_bytes == 0 || run == 0 || iters == 0 {
            return Err(BenchError::data_format(
                path,
                format!("line {line_no}: size_bytes, run and iters must be positive"),
            ));
        }
        let expected = seconds_total / iters as f64;
        if (seconds_per_sign - expected).abs() > PER_SIGN_TOLERANCE + 1e-6 * expected {
            return Err(BenchError::data_format(
                path,
                format!(
                    "line {line_no}: seconds_per_sign {seconds_per_sign} \
                     != {seconds_total}/{iters}"
                ),
            ));
        }

        samples.push(Sample {
            size_bytes,
            run,
            iters,
            seconds_total,
            seconds_per_sign,
        });
    }
    Ok(samples)
}

pub fn render_summary(rows: &[SummaryRow]) -> String {
    let mut out = String::from(SUMMARY_HEADER);
    out.push('\n');
    for r in rows {
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            r.size_bytes,
            r.samples,
            r.mean_seconds_per_sign,
            r.stdev_seconds_per_sign,
            r.throughput_mb_per_s
        ));
    }
    out
}

/// Replaces the summary dataset atomically.
pub fn write_summary(path: &Path, rows: &[SummaryRow]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| BenchError::store(path, e))?;
    tmp.write_all(render_summary(rows).as_bytes())
        .and_then(|_| tmp.as_file().sync_data())
        .map_err(|e| BenchError::store(path, e))?;
    tmp.persist(path)
        .map_err(|e| BenchError::store(path, e.error))?;
    Ok(())
}

pub fn read_summary(path: &Path) -> Result<Vec<SummaryRow>> {
    let lines = read_lines(path, "summary")?;
    let rows = data_rows(path, &lines, SUMMARY_HEADER, 5)?;

    let mut out = Vec::with_capacity(rows.len());
    for (line_no, f) in rows {
        let size_bytes: u64 = parse_field(path, line_no, "size_bytes", f[0])?;
        let samples: usize = parse_field(path, line_no, "samples", f[1])?;
        let mean = positive_seconds(path, line_no, "mean_seconds_per_sign", f[2])?;
        let stdev: f64 = parse_field(path, line_no, "stdev_seconds_per_sign", f[3])?;
        let throughput: f64 = parse_field(path, line_no, "throughput_MB_per_s", f[4])?;
        if size_bytes == 0 || samples == 0 || !stdev.is_finite() || stdev < 0.0 {
            return Err(BenchError::data_format(
                path,
                format!("line {line_no}: invalid summary row"),
            ));
        }
        out.push(SummaryRow {
            size_bytes,
            samples,
            mean_seconds_per_sign: mean,
            stdev_seconds_per_sign: stdev,
            throughput_mb_per_s: throughput,
        });
    }
    Ok(out)
}

pub fn write_run_meta(path: &Path, meta: &RunMeta) -> Result<()> {
    let json = serde_json::to_string_pretty(meta).map_err(|e| BenchError::store(path, e.into()))?;
    fs::write(path, json).map_err(|e| BenchError::store(path, e))
}
