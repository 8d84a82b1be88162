//! CSV-style sample loading
//!
//! The first line is a header. Every following line starts with a single
//! 1-based class digit, a comma, then the text, which is kept verbatim.

use bytes::Bytes;
use std::path::Path;

use crate::types::{LabelSet, Sample};
use crate::{Error, Result};

const DELIMITER: u8 = b',';

/// Parses labeled rows; `content` shares its buffer with the returned texts
pub fn parse_samples(content: Bytes, labels: &LabelSet) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();
    let mut start = 0;

    for (line_index, end) in line_ends(&content).enumerate() {
        let line_start = start;
        start = end + 1;

        // header
        if line_index == 0 {
            continue;
        }

        let mut line = content.slice(line_start..end);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        if line.is_empty() {
            continue;
        }

        samples.push(parse_row(line, line_index + 1, labels)?);
    }

    Ok(samples)
}

/// Reads and parses a sample file
pub fn load_samples(path: impl AsRef<Path>, labels: &LabelSet) -> Result<Vec<Sample>> {
    let path = path.as_ref();
    let content = std::fs::read(path).map_err(|e| {
        std::io::Error::new(e.kind(), format!("failed to read {}: {}", path.display(), e))
    })?;

    let samples = parse_samples(Bytes::from(content), labels)?;
    tracing::info!(path = %path.display(), samples = samples.len(), "Loaded samples");
    Ok(samples)
}

fn line_ends(content: &[u8]) -> impl Iterator<Item = usize> + '_ {
    let newlines = content
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'\n')
        .map(|(i, _)| i);
    let tail = match content.last() {
        Some(b'\n') | None => None,
        Some(_) => Some(content.len()),
    };
    newlines.chain(tail)
}

fn parse_row(line: Bytes, line_number: usize, labels: &LabelSet) -> Result<Sample> {
    let invalid = |reason: String| Error::InvalidSample {
        line: line_number,
        reason,
    };

    let digit = line[0];
    if !digit.is_ascii_digit() {
        return Err(invalid(format!(
            "class must be a single digit, found {:?}",
            digit as char
        )));
    }
    if line.get(1) != Some(&DELIMITER) {
        return Err(invalid("expected ',' after the class digit".to_string()));
    }

    let class = (digit - b'0') as usize;
    if class == 0 || class > labels.len() {
        return Err(invalid(format!(
            "class {} outside 1..={}",
            class,
            labels.len()
        )));
    }

    let text = line.slice(2..);
    if text.is_empty() {
        return Err(invalid("empty text".to_string()));
    }

    Ok(Sample {
        class_index: class - 1,
        text,
    })
}
