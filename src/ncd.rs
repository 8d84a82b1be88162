//! Normalized compression distance
//!
//! `ncd = (C(train ++ query) - min(C(train), C(query))) / max(C(train), C(query))`
//!
//! The training text always comes first in the concatenation and no
//! separator is inserted. Changing either changes every distance, so both are
//! fixed for the whole crate.

use crate::compression::{CompressionOracle, ScratchArena};
use crate::{Error, Result};

/// Combines three compressed sizes into a distance.
///
/// Two empty compressions (`max == 0`) are identical by definition and yield
/// `0.0` instead of dividing by zero.
pub fn ncd(ca: usize, cb: usize, cab: usize) -> Result<f32> {
    let mn = ca.min(cb) as f32;
    let mx = ca.max(cb) as f32;
    if mx == 0.0 {
        return Ok(0.0);
    }

    let distance = (cab as f32 - mn) / mx;
    if !distance.is_finite() {
        return Err(Error::InvalidDistance(format!(
            "ncd({}, {}, {}) = {}",
            ca, cb, cab, distance
        )));
    }
    Ok(distance)
}

/// Distance from `train` to `query`, where `cb` is the query's precomputed
/// compressed size.
pub fn ncd_with(
    oracle: &mut CompressionOracle,
    arena: &mut ScratchArena,
    train: &[u8],
    query: &[u8],
    cb: usize,
) -> Result<f32> {
    let ca = oracle.compressed_size(arena, train)?;
    let cab = oracle.compressed_size_joined(arena, train, query)?;
    ncd(ca, cb, cab)
}
