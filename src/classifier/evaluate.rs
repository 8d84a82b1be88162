//! Accuracy bookkeeping over a labeled test set

use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::NcdClassifier;
use crate::types::{ClassIndex, Sample};
use crate::Result;

/// Outcome of evaluating a test set, in test-set order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub correct: usize,
    pub total: usize,
    pub predictions: Vec<ClassIndex>,
}

impl Evaluation {
    /// `correct / total`, or `0.0` for an empty test set
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64
    }

    fn record(&mut self, predicted: ClassIndex, actual: ClassIndex) {
        self.predictions.push(predicted);
        self.total += 1;
        if predicted == actual {
            self.correct += 1;
        }
    }
}

impl NcdClassifier {
    /// Predicts every test sample exactly once, in order.
    ///
    /// Stops at the first failing prediction.
    pub fn evaluate(&mut self, test_samples: &[Sample], k: usize) -> Result<Evaluation> {
        let started = Instant::now();
        let mut evaluation = Evaluation {
            predictions: Vec::with_capacity(test_samples.len()),
            ..Evaluation::default()
        };

        for (position, sample) in test_samples.iter().enumerate() {
            let predicted = self.round(sample.text.clone(), k)?;
            evaluation.record(predicted, sample.class_index);

            if (position + 1) % self.progress_interval == 0 {
                tracing::debug!(
                    done = position + 1,
                    total = test_samples.len(),
                    correct = evaluation.correct,
                    "Evaluating"
                );
            }
        }

        tracing::info!(
            correct = evaluation.correct,
            total = evaluation.total,
            accuracy = evaluation.accuracy(),
            elapsed = ?started.elapsed(),
            "Evaluation finished"
        );
        Ok(evaluation)
    }
}
