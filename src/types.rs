//! Core types for ncdknn

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Class index, 0-based, always below the label table length
pub type ClassIndex = usize;

/// Training corpus shared read-only by every worker
pub type Corpus = Arc<[Sample]>;

/// Labeled text sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub class_index: ClassIndex,
    pub text: Bytes,
}

impl Sample {
    pub fn new(class_index: ClassIndex, text: impl Into<Bytes>) -> Self {
        Self {
            class_index,
            text: text.into(),
        }
    }
}

/// Distance from one training sample to the current query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceRecord {
    pub distance: f32,
    pub class_index: ClassIndex,
}

/// Human-readable label table.
///
/// Opaque to the classifier apart from its length, which bounds the valid
/// class indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(labels.into_iter().map(Into::into).collect())
    }

    /// AG News topics
    pub fn news() -> Self {
        Self::new(["World", "Sports", "Business", "Sci/Tech"])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn name(&self, class_index: ClassIndex) -> Option<&str> {
        self.0.get(class_index).map(String::as_str)
    }

    pub fn contains(&self, class_index: ClassIndex) -> bool {
        class_index < self.0.len()
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::news()
    }
}
