//! Training run summary report generation

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;
use std::path::Path;

use crate::model::metrics::Evaluation;
use crate::model::search::TuningOutcome;
use crate::pipeline::split::TrainingData;

/// Summary of one training run, rendered after the artifact is stored.
#[derive(Debug)]
pub struct TrainingSummary {
    train_rows: usize,
    valid_rows: usize,
    test_rows: usize,
    feature_count: usize,
    trials: usize,
    best_loss: f64,
    evaluation: Evaluation,
    artifact_path: String,
}

impl TrainingSummary {
    pub fn new(
        data: &TrainingData,
        outcome: &TuningOutcome,
        evaluation: &Evaluation,
        artifact_path: &Path,
    ) -> Self {
        let best_loss = outcome
            .trials
            .iter()
            .map(|trial| trial.loss)
            .fold(f64::INFINITY, f64::min);
        Self {
            train_rows: data.x_train.height(),
            valid_rows: data.x_valid.height(),
            test_rows: data.x_test.height(),
            feature_count: data.feature_names.len(),
            trials: outcome.trials.len(),
            best_loss,
            evaluation: *evaluation,
            artifact_path: artifact_path.display().to_string(),
        }
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("TRAINING SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![
            Cell::new("Rows (train/valid/test)"),
            Cell::new(format!(
                "{}/{}/{}",
                self.train_rows, self.valid_rows, self.test_rows
            )),
        ]);
        table.add_row(vec![
            Cell::new("Features"),
            Cell::new(self.feature_count),
        ]);
        table.add_row(vec![
            Cell::new("Search trials"),
            Cell::new(self.trials),
        ]);
        table.add_row(vec![
            Cell::new("Best trial loss (1 - F1)"),
            Cell::new(format!("{:.4}", self.best_loss)),
        ]);
        table.add_row(vec![
            Cell::new("Validation F1"),
            Cell::new(format!("{:.4}", self.evaluation.validation_f1)),
        ]);
        table.add_row(vec![
            Cell::new("Test F1"),
            Cell::new(format!("{:.4}", self.evaluation.test_f1))
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec![
            Cell::new("Validation accuracy"),
            Cell::new(format!("{:.4}", self.evaluation.validation_accuracy)),
        ]);
        table.add_row(vec![
            Cell::new("Test accuracy"),
            Cell::new(format!("{:.4}", self.evaluation.test_accuracy)),
        ]);
        table.add_row(vec![
            Cell::new("Artifact"),
            Cell::new(&self.artifact_path),
        ]);

        // Indent the table
        for line in table.to_string().lines() {
            println!("    {}", line);
        }
    }
}
