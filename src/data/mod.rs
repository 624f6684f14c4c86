//! Tabular data handling on top of polars.
//!
//! CSV files are the only on-disk format the stages exchange. Model code works
//! on [`FeatureMatrix`], a column-major `f64` view of a frame.

use anyhow::{Context, Result};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub mod schema;

pub use schema::{DtypeMismatch, SchemaReport};

/// Read a CSV file with a header row.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    CsvReader::from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?
        .has_header(true)
        .finish()
        .with_context(|| format!("Failed to parse CSV file {}", path.display()))
}

/// Write a frame as CSV with a header row, replacing any existing file.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create CSV file {}", path.display()))?;
    write_csv_to(df, file).with_context(|| format!("Failed to write CSV file {}", path.display()))
}

/// Write a frame as CSV with a header row to any writer.
pub fn write_csv_to<W: Write>(df: &mut DataFrame, writer: W) -> Result<()> {
    CsvWriter::new(writer)
        .finish(df)
        .context("Failed to serialize CSV data")
}

/// Add an `f64` column, replacing any existing column with the same name.
pub fn set_f64_column(df: &mut DataFrame, name: &str, values: Vec<f64>) -> Result<()> {
    df.with_column(Series::new(name, values))
        .with_context(|| format!("Failed to set column '{}'", name))?;
    Ok(())
}

/// Column names paired with their schema dtype names, in frame order.
pub fn column_dtypes(df: &DataFrame) -> Vec<(String, String)> {
    df.get_columns()
        .iter()
        .map(|series| {
            (
                series.name().to_string(),
                dtype_name(series.dtype()).to_string(),
            )
        })
        .collect()
}

/// Map a polars dtype onto the names used in `schema.yaml`.
///
/// Anything that is not a plain boolean or numeric column reports as
/// `object`, matching how text columns are described in the schema.
pub fn dtype_name(dtype: &DataType) -> &'static str {
    match dtype {
        DataType::Boolean => "bool",
        DataType::UInt32 => "uint32",
        DataType::UInt64 => "uint64",
        DataType::Int32 => "int32",
        DataType::Int64 => "int64",
        DataType::Float32 => "float32",
        DataType::Float64 => "float64",
        _ => "object",
    }
}

/// Shuffle rows with a seeded RNG and split off `ceil(n * test_size)` rows
/// as the test set.
pub fn train_test_split(
    df: &DataFrame,
    test_size: f64,
    seed: u64,
) -> Result<(DataFrame, DataFrame)> {
    let n_rows = df.height();
    let n_test = (n_rows as f64 * test_size).ceil() as usize;

    if n_test == 0 || n_test >= n_rows {
        anyhow::bail!(
            "test_size={} with {} rows leaves an empty train or test set",
            test_size,
            n_rows
        );
    }

    let mut indices: Vec<IdxSize> = (0..n_rows as IdxSize).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_indices, train_indices) = indices.split_at(n_test);
    let train = df
        .take(&IdxCa::from_vec("idx", train_indices.to_vec()))
        .context("Failed to gather train rows")?;
    let test = df
        .take(&IdxCa::from_vec("idx", test_indices.to_vec()))
        .context("Failed to gather test rows")?;

    Ok((train, test))
}

/// Values of a column cast to `f64`. Nulls (including failed casts) are an error.
pub fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df
        .column(name)
        .with_context(|| format!("Column '{}' not found", name))?;
    let casted = series
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' is not numeric", name))?;
    let values = casted
        .f64()
        .with_context(|| format!("Column '{}' is not numeric", name))?;

    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.with_context(|| format!("Missing value in column '{}' at row {}", name, row))
        })
        .collect()
}

/// Column-major numeric features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub columns: Vec<Vec<f64>>,
    pub n_rows: usize,
}

impl FeatureMatrix {
    /// Build a matrix from the named columns of `df`, in the given order.
    pub fn from_frame(df: &DataFrame, names: &[String]) -> Result<Self> {
        let columns = names
            .iter()
            .map(|name| column_as_f64(df, name))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            names: names.to_vec(),
            columns,
            n_rows: df.height(),
        })
    }

    /// Every column except `target` as features, plus the target values.
    pub fn features_and_target(df: &DataFrame, target: &str) -> Result<(Self, Vec<f64>)> {
        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|name| *name != target)
            .map(String::from)
            .collect();

        if names.len() == df.width() {
            anyhow::bail!("Target column '{}' not found in data", target);
        }
        if names.is_empty() {
            anyhow::bail!("No feature columns besides target '{}'", target);
        }

        let features = Self::from_frame(df, &names)?;
        let target = column_as_f64(df, target)?;
        Ok((features, target))
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }
}
