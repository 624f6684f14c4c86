//! Comparison of a dataset's columns against the expected schema.

use std::collections::BTreeMap;
use std::fmt;

/// A column present on both sides whose dtype differs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtypeMismatch {
    pub column: String,
    pub expected: String,
    pub actual: String,
}

/// Outcome of comparing actual columns to the schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    /// Data columns the schema does not know about
    pub unexpected_columns: Vec<String>,
    /// Schema columns absent from the data
    pub missing_columns: Vec<String>,
    pub dtype_mismatches: Vec<DtypeMismatch>,
}

impl SchemaReport {
    /// Compare `(name, dtype)` pairs taken from the data with the schema map.
    pub fn compare(actual: &[(String, String)], expected: &BTreeMap<String, String>) -> Self {
        let mut report = Self::default();

        for (column, dtype) in actual {
            match expected.get(column) {
                None => report.unexpected_columns.push(column.clone()),
                Some(expected_dtype) => {
                    if normalize_dtype(expected_dtype) != normalize_dtype(dtype) {
                        report.dtype_mismatches.push(DtypeMismatch {
                            column: column.clone(),
                            expected: expected_dtype.clone(),
                            actual: dtype.clone(),
                        });
                    }
                }
            }
        }

        for column in expected.keys() {
            if !actual.iter().any(|(name, _)| name == column) {
                report.missing_columns.push(column.clone());
            }
        }

        report
    }

    pub fn is_valid(&self) -> bool {
        self.unexpected_columns.is_empty()
            && self.missing_columns.is_empty()
            && self.dtype_mismatches.is_empty()
    }

    /// One human-readable line per problem.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for column in &self.unexpected_columns {
            issues.push(format!("column '{}' is not in the schema", column));
        }
        for column in &self.missing_columns {
            issues.push(format!("column '{}' is missing from the data", column));
        }
        for mismatch in &self.dtype_mismatches {
            issues.push(mismatch.to_string());
        }
        issues
    }
}

impl fmt::Display for DtypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "column '{}' has dtype {} but the schema expects {}",
            self.column, self.actual, self.expected
        )
    }
}

fn normalize_dtype(dtype: &str) -> String {
    let lower = dtype.trim().to_lowercase();
    match lower.as_str() {
        "float" | "double" | "f64" => "float64".to_string(),
        "int" | "integer" | "i64" => "int64".to_string(),
        "str" | "string" | "utf8" => "object".to_string(),
        "boolean" => "bool".to_string(),
        _ => lower,
    }
}
