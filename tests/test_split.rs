//! Tests for the stratified split generator

use churnflow::pipeline::generate_train_test_valid_data;

#[path = "common/mod.rs"]
mod common;

#[test]
fn test_split_proportions_and_stratification() {
    // 1000 rows, 20% positive: expect 700/150/150 with ~140/30/30 positives.
    let df = common::create_customer_batch(1000, 0.2);

    let data = generate_train_test_valid_data(&df).unwrap();

    assert_eq!(data.x_train.height(), 700);
    assert_eq!(data.x_valid.height(), 150);
    assert_eq!(data.x_test.height(), 150);
    assert_eq!(data.y_train.len(), 700);
    assert_eq!(data.y_valid.len(), 150);
    assert_eq!(data.y_test.len(), 150);

    let positives = |y: &[u8]| y.iter().filter(|&&v| v == 1).count();
    assert_eq!(positives(&data.y_train), 140);
    assert_eq!(positives(&data.y_valid), 30);
    assert_eq!(positives(&data.y_test), 30);
}

#[test]
fn test_partitions_are_disjoint_and_cover_the_batch() {
    let df = common::create_customer_batch(200, 0.25);

    let data = generate_train_test_valid_data(&df).unwrap();

    // CreditScore is unique per fixture row, so it identifies rows across
    // the processed partitions.
    let train = common::credit_scores(&data.x_train);
    let valid = common::credit_scores(&data.x_valid);
    let test = common::credit_scores(&data.x_test);

    assert!(train.is_disjoint(&valid));
    assert!(train.is_disjoint(&test));
    assert!(valid.is_disjoint(&test));

    let union: std::collections::BTreeSet<i64> =
        train.union(&valid).chain(test.iter()).copied().collect();
    assert_eq!(union.len(), 200);
    assert_eq!(union, common::credit_scores(&df));
}

#[test]
fn test_split_is_reproducible() {
    let df = common::create_customer_batch(120, 0.25);

    let first = generate_train_test_valid_data(&df).unwrap();
    let second = generate_train_test_valid_data(&df).unwrap();

    assert_eq!(first.y_train, second.y_train);
    assert_eq!(
        common::credit_scores(&first.x_train),
        common::credit_scores(&second.x_train)
    );
}

#[test]
fn test_partition_schemas_agree() {
    let df = common::create_customer_batch(90, 0.33);

    let data = generate_train_test_valid_data(&df).unwrap();

    let names = |frame: &polars::prelude::DataFrame| -> Vec<String> {
        frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    };
    assert_eq!(names(&data.x_train), data.feature_names);
    assert_eq!(names(&data.x_valid), data.feature_names);
    assert_eq!(names(&data.x_test), data.feature_names);
    assert!(!data.feature_names.contains(&"Exited".to_string()));
    assert!(!data.feature_names.contains(&"Geography".to_string()));
}

#[test]
fn test_missing_target_column_errors() {
    let df = common::create_inference_batch(50);

    let result = generate_train_test_valid_data(&df);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Exited"));
}
