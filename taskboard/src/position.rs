//! Position model: dense zero-based ranks and the reinsert primitives.
//!
//! Every ordered container stores its members at positions `0..n-1`. After
//! any move the whole container is re-ranked with [`assign_dense_positions`];
//! nothing else in the crate computes positions.

use indexmap::IndexMap;
use std::fmt;
use std::hash::Hash;
use thiserror::Error;

/// Which side of a move an index belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Source,
    Destination,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Destination => f.write_str("destination"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    /// `len` is the length the index was checked against
    #[error("{endpoint} index {index} out of range (length {len})")]
    IndexOutOfRange {
        endpoint: Endpoint,
        index: usize,
        len: usize,
    },
}

/// Move the element at `from` so it ends up at `to`.
///
/// `to` is interpreted against the sequence after removal, so valid values
/// are `0..len` for `from` and `0..len-1` inclusive for `to`.
pub fn reinsert<T: Clone>(sequence: &[T], from: usize, to: usize) -> Result<Vec<T>, PositionError> {
    if from >= sequence.len() {
        return Err(PositionError::IndexOutOfRange {
            endpoint: Endpoint::Source,
            index: from,
            len: sequence.len(),
        });
    }
    let remaining = sequence.len() - 1;
    if to > remaining {
        return Err(PositionError::IndexOutOfRange {
            endpoint: Endpoint::Destination,
            index: to,
            len: remaining,
        });
    }

    let mut result = sequence.to_vec();
    let moved = result.remove(from);
    result.insert(to, moved);
    Ok(result)
}

/// Move the element at `source[from]` into `destination` at `to`.
///
/// `to` may equal `destination.len()` to append.
pub fn transfer<T: Clone>(
    source: &[T],
    from: usize,
    destination: &[T],
    to: usize,
) -> Result<(Vec<T>, Vec<T>), PositionError> {
    if from >= source.len() {
        return Err(PositionError::IndexOutOfRange {
            endpoint: Endpoint::Source,
            index: from,
            len: source.len(),
        });
    }
    if to > destination.len() {
        return Err(PositionError::IndexOutOfRange {
            endpoint: Endpoint::Destination,
            index: to,
            len: destination.len(),
        });
    }

    let mut source = source.to_vec();
    let mut destination = destination.to_vec();
    let moved = source.remove(from);
    destination.insert(to, moved);
    Ok((source, destination))
}

/// Rank every element by its index
pub fn assign_dense_positions<T: Clone + Eq + Hash>(sequence: &[T]) -> IndexMap<T, usize> {
    sequence
        .iter()
        .enumerate()
        .map(|(position, id)| (id.clone(), position))
        .collect()
}

/// True when dropping back onto the slot the element came from
pub fn is_unchanged(same_container: bool, from: usize, to: usize) -> bool {
    same_container && from == to
}

/// True when the positions are exactly `{0..n-1}`
pub fn is_dense(positions: impl IntoIterator<Item = usize>) -> bool {
    let mut positions: Vec<usize> = positions.into_iter().collect();
    positions.sort_unstable();
    positions.iter().enumerate().all(|(i, &p)| i == p)
}
