//! Index normalization and range validation.
//!
//! Stream ranges are half-open `[from, to)`. A negative index counts from
//! the end with an extra slot, so `-1` means "the current length" and
//! `(0, -1)` addresses the whole stream:
//!
//! ```text
//! length 5:   0   1   2   3   4   5
//! negative:  -6  -5  -4  -3  -2  -1
//! ```
//!
//! ```rust
//! use rangestream_core::range;
//!
//! assert_eq!(range::normalize(0, -1, 5), (0, 5));
//! assert_eq!(range::check_range(1, 3, 5).unwrap(), 1..3);
//! assert!(range::check_range(3, 1, 5).is_err());
//! assert_eq!(range::resolve(4, 4, 0).unwrap(), None);
//! ```

use crate::error::{StreamError, StreamResult};
use std::ops::Range;

/// Converts a negative index into its position counted from the end.
#[must_use]
pub fn offset(index: i64, len: u64) -> i64 {
    if index < 0 {
        len_index(len).saturating_add(1).saturating_add(index)
    } else {
        index
    }
}

/// Resolves negative `from` and `to` against `len`. Does not validate.
#[must_use]
pub fn normalize(from: i64, to: i64, len: u64) -> (i64, i64) {
    (offset(from, len), offset(to, len))
}

/// Validates a normalized range.
///
/// # Errors
///
/// Returns [`StreamError::InvalidRange`] unless `0 <= from <= to <= len`.
pub fn check_range(from: i64, to: i64, len: u64) -> StreamResult<Range<u64>> {
    if from < 0 || from > to || to > len_index(len) {
        return Err(StreamError::InvalidRange { from, to, len });
    }
    Ok(from as u64..to as u64)
}

/// Normalizes and validates a caller-supplied range.
///
/// Returns `Ok(None)` when the raw indices are equal: an empty request
/// always succeeds without looking at the length.
///
/// # Errors
///
/// Returns [`StreamError::InvalidRange`] if the normalized range does not fit.
pub fn resolve(from: i64, to: i64, len: u64) -> StreamResult<Option<Range<u64>>> {
    if from == to {
        return Ok(None);
    }
    let (from, to) = normalize(from, to, len);
    check_range(from, to, len).map(Some)
}

/// Converts an unsigned start index to the signed form used for
/// normalization.
///
/// # Errors
///
/// Returns [`StreamError::InvalidRange`] for indices above `i64::MAX`.
pub fn start_index(from: u64, to: i64) -> StreamResult<i64> {
    i64::try_from(from).map_err(|_| StreamError::InvalidRange {
        from: i64::MAX,
        to,
        len: 0,
    })
}

pub(crate) fn len_index(len: u64) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}
