//! Aggregation of per-worker distances and k-NN majority vote

use crate::types::{ClassIndex, DistanceRecord};
use crate::{Error, Result};

/// Merges worker buffers into one ranked list.
///
/// The merged list and the class tally are kept between rounds so a
/// steady-state round allocates nothing.
#[derive(Debug, Default)]
pub struct Aggregator {
    merged: Vec<DistanceRecord>,
    class_freq: Vec<usize>,
}

impl Aggregator {
    pub fn with_capacity(corpus_len: usize, n_classes: usize) -> Self {
        Self {
            merged: Vec::with_capacity(corpus_len),
            class_freq: vec![0; n_classes],
        }
    }

    /// Concatenates `buffers` in worker order, replacing the previous round
    pub fn merge<'a, I>(&mut self, buffers: I)
    where
        I: IntoIterator<Item = &'a Vec<DistanceRecord>>,
    {
        self.merged.clear();
        for buffer in buffers {
            self.merged.extend_from_slice(buffer);
        }
    }

    /// Sorts ascending by distance; equal distances keep merge order
    pub fn rank(&mut self) -> Result<()> {
        if let Some(position) = self.merged.iter().position(|r| r.distance.is_nan()) {
            return Err(Error::InvalidDistance(format!(
                "NaN distance at merged position {}",
                position
            )));
        }

        // stable
        self.merged.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.merged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }

    /// The `k` closest records, fewer if the corpus is smaller
    pub fn nearest(&self, k: usize) -> &[DistanceRecord] {
        &self.merged[..k.min(self.merged.len())]
    }

    /// Majority vote over the `k` closest records
    pub fn vote(&mut self, k: usize, n_classes: usize) -> Result<ClassIndex> {
        let end = k.min(self.merged.len());
        majority_vote_into(&self.merged[..end], n_classes, &mut self.class_freq)
    }
}

/// Most frequent class among `neighbors`; ties go to the lowest class index.
pub fn majority_vote(neighbors: &[DistanceRecord], n_classes: usize) -> Result<ClassIndex> {
    let mut class_freq = Vec::new();
    majority_vote_into(neighbors, n_classes, &mut class_freq)
}

fn majority_vote_into(
    neighbors: &[DistanceRecord],
    n_classes: usize,
    class_freq: &mut Vec<usize>,
) -> Result<ClassIndex> {
    if neighbors.is_empty() {
        return Err(Error::invalid_input("cannot vote without neighbors"));
    }
    if n_classes == 0 {
        return Err(Error::invalid_config("label table is empty"));
    }

    class_freq.clear();
    class_freq.resize(n_classes, 0);

    for record in neighbors {
        let slot = class_freq.get_mut(record.class_index).ok_or_else(|| {
            Error::invalid_input(format!(
                "class index {} outside label table of {}",
                record.class_index, n_classes
            ))
        })?;
        *slot += 1;
    }

    let mut predicted = 0;
    for class_index in 1..n_classes {
        if class_freq[predicted] < class_freq[class_index] {
            predicted = class_index;
        }
    }

    Ok(predicted)
}
