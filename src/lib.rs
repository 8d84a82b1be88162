//! ncdknn - k-nearest-neighbor text classification by compression
//!
//! Distances between texts are estimated with the normalized compression
//! distance (NCD) instead of a learned embedding:
//! - One deflate stream and scratch arena per worker, reused for every query
//! - A fixed pool of worker threads, one contiguous corpus chunk each
//! - Fork-join rounds merged into a stable ranking and a k-NN majority vote

pub mod classifier;
pub mod compression;
pub mod config;
pub mod dataset;
pub mod error;
pub mod ncd;
pub mod partition;
pub mod types;
pub mod vote;
pub mod worker;

pub use classifier::{ClassifierOptions, Evaluation, NcdClassifier, Prediction};
pub use error::{Error, Result};
