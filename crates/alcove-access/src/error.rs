//! Access-control errors.

use thiserror::Error;

/// Rejection of a capacity value outside the accepted range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapacityError {
    #[error("capacity {given} is out of range [0, {max}]")]
    OutOfRange { given: i64, max: u32 },
}
