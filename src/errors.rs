//! Error module.

use thiserror::Error;

/// ROM loading error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomError {
    /// ROM does not fit between 0x200 and the end of memory.
    #[error("ROM is too large: {size} bytes (max. {max})")]
    RomTooLarge {
        /// ROM size in bytes.
        size: usize,
        /// Maximum loadable size.
        max: usize,
    },
}

/// Call stack error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// Push on a full stack.
    #[error("stack overflow (depth: {0})")]
    Overflow(usize),
    /// Pop on an empty stack.
    #[error("stack underflow")]
    Underflow,
}

/// Fatal fault surfaced by `step`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepError {
    /// Call/return stack fault. The machine halts.
    #[error("stack fault: {0}")]
    StackFault(#[from] StackError),
    /// Step on a halted machine. Reset to resume.
    #[error("machine is halted")]
    Halted,
}
