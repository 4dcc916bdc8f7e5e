//! Feature engineering: raw customer records to a model-ready table
//!
//! The transformer drops the leading identifier columns, encodes Gender
//! through an explicit mapping, one-hot expands Geography against a fitted
//! vocabulary, and appends the NumOfProducts x Tenure interaction. The
//! vocabulary is fitted once during training and persisted with the model
//! artifact so the inference schema cannot drift from the training schema.

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

use crate::pipeline::error::PipelineError;

/// Number of leading non-predictive identifier columns
/// (row number, customer id, surname).
pub const IDENTIFIER_PREFIX: usize = 3;

/// Name of the binary training target column.
pub const TARGET_COLUMN: &str = "Exited";

/// Fitted set of Geography categories governing the one-hot expansion.
///
/// Categories are held sorted so the expanded column set is a deterministic
/// function of the vocabulary alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeographyVocab {
    pub categories: Vec<String>,
}

impl GeographyVocab {
    /// Fit the vocabulary from the distinct Geography values of a batch.
    pub fn fit(df: &DataFrame) -> Result<Self> {
        let geography = df
            .column("Geography")
            .map_err(|_| PipelineError::MissingColumn("Geography".to_string()))?;
        let categories: BTreeSet<String> = geography
            .str()
            .context("Geography column must be textual")?
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect();

        Ok(Self {
            categories: categories.into_iter().collect(),
        })
    }
}

/// Transform a customer-record batch into the model-ready feature table.
///
/// Steps, in order: drop the identifier prefix positionally, encode Gender
/// as Male=0 / Female=1 (any other value is rejected), expand Geography into
/// one Int32 indicator column per vocabulary category, and append
/// `Products_Tenure_relation`. A target column, when present, passes through
/// untouched. The input frame is not mutated.
pub fn processing_pipeline(df: &DataFrame, vocab: &GeographyVocab) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    if names.len() <= IDENTIFIER_PREFIX {
        return Err(PipelineError::TooFewColumns {
            expected: IDENTIFIER_PREFIX,
            found: names.len(),
        }
        .into());
    }

    let mut out = df.select(names[IDENTIFIER_PREFIX..].iter().cloned())?;

    encode_gender(&mut out)?;
    encode_geography(&mut out, vocab)?;
    add_products_tenure_relation(&mut out)?;

    Ok(out)
}

/// Map Gender in place through the explicit Male=0 / Female=1 encoding.
///
/// Values outside the mapping (including missing ones) are rejected rather
/// than silently passed through unencoded.
fn encode_gender(df: &mut DataFrame) -> Result<()> {
    let gender = df
        .column("Gender")
        .map_err(|_| PipelineError::MissingColumn("Gender".to_string()))?;

    let encoded = gender
        .str()
        .context("Gender column must be textual")?
        .into_iter()
        .map(|value| match value {
            Some("Male") => Ok(0i32),
            Some("Female") => Ok(1i32),
            Some(other) => Err(PipelineError::UnmappedGender(other.to_string())),
            None => Err(PipelineError::UnmappedGender("<missing>".to_string())),
        })
        .collect::<Result<Vec<i32>, PipelineError>>()?;

    df.with_column(Column::new("Gender".into(), encoded))?;
    Ok(())
}

/// Expand Geography into indicator columns named after each vocabulary
/// category, then drop the original column.
///
/// Batch values outside the vocabulary encode as all-zero rows and are
/// logged; vocabulary categories absent from the batch still produce their
/// (all-zero) columns, keeping the schema stable.
fn encode_geography(df: &mut DataFrame, vocab: &GeographyVocab) -> Result<()> {
    let geography = df
        .column("Geography")
        .map_err(|_| PipelineError::MissingColumn("Geography".to_string()))?;
    let values: Vec<Option<&str>> = geography
        .str()
        .context("Geography column must be textual")?
        .into_iter()
        .collect();

    let unseen: BTreeSet<&str> = values
        .iter()
        .flatten()
        .filter(|value| !vocab.categories.iter().any(|c| c == *value))
        .copied()
        .collect();
    if !unseen.is_empty() {
        warn!(
            "Geography values outside the fitted vocabulary encode as all zeros: {:?}",
            unseen
        );
    }

    let mut indicators = Vec::with_capacity(vocab.categories.len());
    for category in &vocab.categories {
        let indicator: Vec<i32> = values
            .iter()
            .map(|value| (*value == Some(category.as_str())) as i32)
            .collect();
        indicators.push(Column::new(category.as_str().into(), indicator));
    }

    *df = df.drop("Geography")?;
    *df = df.hstack(&indicators)?;
    Ok(())
}

/// Append `Products_Tenure_relation`, the elementwise product of
/// NumOfProducts and Tenure.
fn add_products_tenure_relation(df: &mut DataFrame) -> Result<()> {
    let products = numeric_column(df, "NumOfProducts")?;
    let tenure = numeric_column(df, "Tenure")?;

    let relation: Vec<Option<f64>> = products
        .f64()?
        .into_iter()
        .zip(tenure.f64()?.into_iter())
        .map(|(p, t)| match (p, t) {
            (Some(p), Some(t)) => Some(p * t),
            _ => None,
        })
        .collect();

    df.with_column(Column::new("Products_Tenure_relation".into(), relation))?;
    Ok(())
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Column> {
    df.column(name)
        .map_err(|_| PipelineError::MissingColumn(name.to_string()))?
        .cast(&DataType::Float64)
        .with_context(|| format!("column '{}' is not numeric", name))
}

/// Materialize the feature table as a row-major f64 matrix in the given
/// column order. Missing values become NaN, which the booster routes to the
/// left branch of each split.
pub fn to_feature_matrix(df: &DataFrame, feature_names: &[String]) -> Result<Vec<Vec<f64>>> {
    let mut columns: Vec<Vec<Option<f64>>> = Vec::with_capacity(feature_names.len());
    for name in feature_names {
        let column = numeric_column(df, name)?;
        columns.push(column.f64()?.into_iter().collect());
    }

    let rows = (0..df.height())
        .map(|i| {
            columns
                .iter()
                .map(|column| column[i].unwrap_or(f64::NAN))
                .collect()
        })
        .collect();
    Ok(rows)
}
