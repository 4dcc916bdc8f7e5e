//! Shared test utilities and fixture generators

use polars::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a deterministic labeled customer batch.
///
/// Columns follow the raw training layout: three leading identifier
/// columns, the demographic/account fields, and the binary `Exited`
/// target. `CreditScore` is unique per row (1000 + row index) so tests can
/// track rows across split partitions. Exactly every
/// `1/positive_fraction`-th row is positive.
pub fn create_customer_batch(rows: usize, positive_fraction: f64) -> DataFrame {
    let period = (1.0 / positive_fraction).round() as usize;
    let geographies = ["France", "Germany", "Spain"];

    let row_number: Vec<i64> = (1..=rows as i64).collect();
    let customer_id: Vec<i64> = (0..rows).map(|i| 15_000_000 + i as i64).collect();
    let surname: Vec<String> = (0..rows).map(|i| format!("Customer{}", i)).collect();
    let credit_score: Vec<i64> = (0..rows).map(|i| 1000 + i as i64).collect();
    let geography: Vec<&str> = (0..rows).map(|i| geographies[i % 3]).collect();
    let gender: Vec<&str> = (0..rows)
        .map(|i| if i % 2 == 0 { "Male" } else { "Female" })
        .collect();
    let age: Vec<i64> = (0..rows).map(|i| 20 + (i % 40) as i64).collect();
    let tenure: Vec<i64> = (0..rows).map(|i| (i % 11) as i64).collect();
    let balance: Vec<f64> = (0..rows).map(|i| (i % 7) as f64 * 25_000.0).collect();
    let num_of_products: Vec<i64> = (0..rows).map(|i| 1 + (i % 4) as i64).collect();
    let has_cr_card: Vec<i64> = (0..rows).map(|i| (i % 2) as i64).collect();
    let is_active: Vec<i64> = (0..rows).map(|i| ((i / 2) % 2) as i64).collect();
    let salary: Vec<f64> = (0..rows).map(|i| 30_000.0 + (i % 50) as f64 * 1000.0).collect();
    let exited: Vec<i64> = (0..rows).map(|i| (i % period == 0) as i64).collect();

    df! {
        "RowNumber" => row_number,
        "CustomerId" => customer_id,
        "Surname" => surname,
        "CreditScore" => credit_score,
        "Geography" => geography,
        "Gender" => gender,
        "Age" => age,
        "Tenure" => tenure,
        "Balance" => balance,
        "NumOfProducts" => num_of_products,
        "HasCrCard" => has_cr_card,
        "IsActiveMember" => is_active,
        "EstimatedSalary" => salary,
        "Exited" => exited,
    }
    .unwrap()
}

/// The same batch without its target column, as inference input.
pub fn create_inference_batch(rows: usize) -> DataFrame {
    create_customer_batch(rows, 0.5).drop("Exited").unwrap()
}

/// Write a DataFrame to a temp CSV with the given delimiter.
pub fn create_temp_csv_with_delimiter(df: &mut DataFrame, delimiter: u8) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file)
        .with_separator(delimiter)
        .finish(df)
        .unwrap();

    (temp_dir, csv_path)
}

/// Distinct CreditScore values of a processed partition, for tracking rows
/// across splits.
pub fn credit_scores(df: &DataFrame) -> std::collections::BTreeSet<i64> {
    df.column("CreditScore")
        .unwrap()
        .cast(&DataType::Int64)
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect()
}
