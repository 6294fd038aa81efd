//! Math engine error taxonomy.

use thiserror::Error;

/// Failures while simulating a swap against one pool.
///
/// `InsufficientLiquidity` is the only variant callers are expected to
/// recover from (the orchestrator folds it into a sentinel result); the rest
/// indicate malformed pool state or arguments.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MathError {
    #[error("input amount exhausts or exceeds the pool's tradeable reserve")]
    InsufficientLiquidity,

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("division by zero in {0}")]
    DivisionByZero(&'static str),

    #[error("invalid pool state: {0}")]
    InvalidState(&'static str),
}
