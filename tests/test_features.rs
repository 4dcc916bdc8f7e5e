//! Tests for the feature transformer

use churnflow::pipeline::{processing_pipeline, to_feature_matrix, GeographyVocab};

#[path = "common/mod.rs"]
mod common;

fn column_names(df: &polars::prelude::DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_schema_is_idempotent_for_shared_geography_set() {
    // Two different batches over the same geography categories must come
    // out with identical schemas.
    let first = common::create_customer_batch(30, 0.5);
    let second = common::create_customer_batch(60, 0.25);

    let vocab_first = GeographyVocab::fit(&first).unwrap();
    let vocab_second = GeographyVocab::fit(&second).unwrap();
    assert_eq!(vocab_first, vocab_second);

    let processed_first = processing_pipeline(&first, &vocab_first).unwrap();
    let processed_second = processing_pipeline(&second, &vocab_second).unwrap();

    assert_eq!(column_names(&processed_first), column_names(&processed_second));

    // Copy-then-apply on the same batch yields the same schema again.
    let processed_again = processing_pipeline(&first, &vocab_first).unwrap();
    assert_eq!(column_names(&processed_first), column_names(&processed_again));
}

#[test]
fn test_input_frame_is_not_mutated() {
    let df = common::create_customer_batch(12, 0.5);
    let before = column_names(&df);

    let vocab = GeographyVocab::fit(&df).unwrap();
    let _ = processing_pipeline(&df, &vocab).unwrap();

    assert_eq!(column_names(&df), before);
}

#[test]
fn test_target_column_passes_through_untouched() {
    let df = common::create_customer_batch(12, 0.5);
    let vocab = GeographyVocab::fit(&df).unwrap();

    let processed = processing_pipeline(&df, &vocab).unwrap();

    let before: Vec<i64> = df
        .column("Exited")
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    let after: Vec<i64> = processed
        .column("Exited")
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(before, after);
}

#[test]
fn test_vocabulary_absent_category_yields_zero_column() {
    // A vocabulary fitted on a wider category set than the batch must still
    // produce every indicator column, all zeros for the absent category.
    let df = common::create_customer_batch(9, 0.33);
    let vocab = GeographyVocab {
        categories: vec![
            "France".to_string(),
            "Germany".to_string(),
            "Portugal".to_string(),
            "Spain".to_string(),
        ],
    };

    let processed = processing_pipeline(&df, &vocab).unwrap();

    let portugal: Vec<i32> = processed
        .column("Portugal")
        .unwrap()
        .i32()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(portugal, vec![0; 9]);
}

#[test]
fn test_indicators_are_exclusive_per_row() {
    let df = common::create_customer_batch(9, 0.33);
    let vocab = GeographyVocab::fit(&df).unwrap();
    let processed = processing_pipeline(&df, &vocab).unwrap();

    let mut totals = vec![0i32; 9];
    for category in &vocab.categories {
        let indicator: Vec<i32> = processed
            .column(category.as_str())
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        for (total, v) in totals.iter_mut().zip(indicator.iter()) {
            *total += v;
        }
    }
    assert_eq!(totals, vec![1; 9], "each row belongs to exactly one category");
}

#[test]
fn test_feature_matrix_follows_requested_order() {
    let df = common::create_customer_batch(5, 0.5);
    let vocab = GeographyVocab::fit(&df).unwrap();
    let processed = processing_pipeline(&df, &vocab).unwrap();

    let names = vec!["Tenure".to_string(), "NumOfProducts".to_string()];
    let matrix = to_feature_matrix(&processed, &names).unwrap();

    assert_eq!(matrix.len(), 5);
    for (i, row) in matrix.iter().enumerate() {
        assert_eq!(row.len(), 2);
        assert_eq!(row[0], (i % 11) as f64);
        assert_eq!(row[1], (1 + i % 4) as f64);
    }
}

#[test]
fn test_feature_matrix_missing_column_errors() {
    let df = common::create_customer_batch(5, 0.5);
    let vocab = GeographyVocab::fit(&df).unwrap();
    let processed = processing_pipeline(&df, &vocab).unwrap();

    let names = vec!["NoSuchFeature".to_string()];
    let result = to_feature_matrix(&processed, &names);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("NoSuchFeature"));
}
