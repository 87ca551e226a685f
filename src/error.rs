//! Error types for the bus.
//!
//! All errors are strongly typed using thiserror. Only registration can
//! fail; nothing that happens inside a dispatch ever escapes to a publisher.

use thiserror::Error;

/// Errors surfaced to the registering collaborator.
#[derive(Debug, Error)]
pub enum BusError {
    /// The `event.topics` registration property is neither absent, a single
    /// string, nor a sequence of strings.
    #[error("invalid topic filter: {reason}")]
    InvalidFilter {
        /// What was wrong with the filter value.
        reason: String,
    },

    /// Two registrations collided on the same rank. Ranks minted by the
    /// registry are unique by construction, so this signals a programming
    /// defect in a caller supplying explicit ranks.
    #[error("duplicate registration rank: priority {priority}, seq {seq}")]
    DuplicateRank {
        /// Priority component of the colliding rank.
        priority: i64,
        /// Sequence component of the colliding rank.
        seq: u64,
    },
}

/// Convenience result alias for bus operations.
pub type BusResult<T> = Result<T, BusError>;
