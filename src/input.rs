//! Plain-text readers for count matrices and discrete trajectories.
//!
//! Both formats accept whitespace or commas as separators. Blank lines and
//! lines starting with `#` are ignored.

use std::path::Path;

use anyhow::{Context, Result, bail};
use msmkit_counts::CountMatrix;
use ndarray::Array2;

fn tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
}

fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
}

/// Parses a square count matrix, one row per line.
pub fn parse_count_matrix(text: &str) -> Result<CountMatrix> {
    let mut values = Vec::new();
    let mut n_rows = 0usize;
    let mut n_cols = None;
    for (line_no, line) in data_lines(text) {
        let row = tokens(line)
            .map(|t| {
                t.parse::<f64>()
                    .with_context(|| format!("line {line_no}: invalid count {t:?}"))
            })
            .collect::<Result<Vec<f64>>>()?;
        match n_cols {
            None => n_cols = Some(row.len()),
            Some(n) if n != row.len() => {
                bail!("line {line_no}: expected {n} columns, got {}", row.len())
            }
            Some(_) => {}
        }
        values.extend(row);
        n_rows += 1;
    }
    let n_cols = n_cols.unwrap_or(0);
    let counts = Array2::from_shape_vec((n_rows, n_cols), values)
        .context("count matrix rows do not form a rectangle")?;
    CountMatrix::new(counts).context("invalid count matrix")
}

/// Parses a discrete trajectory of non-negative integer states.
pub fn parse_dtraj(text: &str) -> Result<Vec<usize>> {
    let mut states = Vec::new();
    for (line_no, line) in data_lines(text) {
        for t in tokens(line) {
            let s = t
                .parse::<usize>()
                .with_context(|| format!("line {line_no}: invalid state {t:?}"))?;
            states.push(s);
        }
    }
    Ok(states)
}

/// Reads a count matrix file.
pub fn read_count_matrix(path: &Path) -> Result<CountMatrix> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read count matrix: {}", path.display()))?;
    parse_count_matrix(&text).with_context(|| format!("in {}", path.display()))
}

/// Reads a discrete trajectory file.
pub fn read_dtraj(path: &Path) -> Result<Vec<usize>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read trajectory: {}", path.display()))?;
    parse_dtraj(&text).with_context(|| format!("in {}", path.display()))
}
