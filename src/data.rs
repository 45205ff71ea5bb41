//! Data loading for per-user activity count tables using Polars

use crate::error::LoadError;
use anyhow::Context;
use log::debug;
use ndarray::Array2;
use polars::prelude::*;
use std::path::Path;

/// Observation table: one row per user, one column per activity category
#[derive(Debug, Clone)]
pub struct ObservationTable {
    /// Feature names in file column order
    pub feature_names: Vec<String>,
    /// Values of the dropped identifier column, one per row
    pub ids: Vec<String>,
    /// Raw feature counts (n_rows, n_features)
    pub features: Array2<f64>,
}

impl ObservationTable {
    /// Build a table from already-parsed parts, checking that shapes agree
    pub fn new(
        feature_names: Vec<String>,
        ids: Vec<String>,
        features: Array2<f64>,
    ) -> crate::Result<Self> {
        if features.ncols() != feature_names.len() {
            return Err(LoadError::Shape(format!(
                "{} feature names for {} columns",
                feature_names.len(),
                features.ncols()
            ))
            .into());
        }
        if features.nrows() != ids.len() {
            return Err(LoadError::Shape(format!(
                "{} ids for {} rows",
                ids.len(),
                features.nrows()
            ))
            .into());
        }

        Ok(Self {
            feature_names,
            ids,
            features,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }
}

/// Load a CSV file and drop its identifier column
///
/// # Arguments
/// * `file_path` - Path to the CSV file (header row required)
/// * `id_column` - Identifier column to drop; `None` drops the first column
///
/// # Returns
/// * `ObservationTable` with every remaining column read as `f64`
pub fn load_observations(
    file_path: impl AsRef<Path>,
    id_column: Option<&str>,
) -> crate::Result<ObservationTable> {
    let path = file_path.as_ref();

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("Failed to open {}", path.display()))?
        .finish()
        .with_context(|| format!("Failed to parse CSV {}", path.display()))?;

    debug!("Read {} rows x {} columns from {}", df.height(), df.width(), path.display());

    table_from_frame(&df, id_column)
}

/// Split a DataFrame into identifier values and a numeric feature matrix
fn table_from_frame(df: &DataFrame, id_column: Option<&str>) -> crate::Result<ObservationTable> {
    let column_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let id_name = match id_column {
        Some(name) => {
            if !column_names.iter().any(|c| c == name) {
                return Err(LoadError::MissingIdColumn(name.to_string()).into());
            }
            name.to_string()
        }
        None => column_names
            .first()
            .cloned()
            .ok_or(LoadError::NoFeatureColumns)?,
    };

    let feature_names: Vec<String> = column_names
        .into_iter()
        .filter(|name| *name != id_name)
        .collect();

    if feature_names.is_empty() {
        return Err(LoadError::NoFeatureColumns.into());
    }
    if df.height() == 0 {
        return Err(LoadError::Empty.into());
    }

    let ids: Vec<String> = df
        .column(&id_name)?
        .cast(&DataType::String)?
        .str()?
        .into_iter()
        .map(|id| id.unwrap_or_default().to_string())
        .collect();

    let mut columns = Vec::with_capacity(feature_names.len());
    for name in &feature_names {
        columns.push(numeric_column(df, name)?);
    }

    let features = Array2::from_shape_fn((df.height(), feature_names.len()), |(row, col)| {
        columns[col][row]
    });

    ObservationTable::new(feature_names, ids, features)
}

/// Read one column as `f64`, rejecting nulls and cells that fail to cast
fn numeric_column(df: &DataFrame, name: &str) -> crate::Result<Vec<f64>> {
    let series = df.column(name)?;
    let nulls_before = series.null_count();
    let casted = series
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' is not numeric", name))?;

    // Non-strict casting turns unparsable strings into nulls
    let nulls = casted.null_count().max(nulls_before);
    if nulls > 0 {
        return Err(LoadError::NonNumeric {
            column: name.to_string(),
            count: nulls,
        }
        .into());
    }

    Ok(casted.f64()?.into_no_null_iter().collect())
}
