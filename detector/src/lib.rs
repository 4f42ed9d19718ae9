#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Immutable per-run detector description.
//!
//! Everything in this crate is constructed once from configuration, validated
//! eagerly, and then shared read-only across all events. A malformed
//! configuration is rejected at construction with a [`DetectorError`]; no
//! degenerate grid or formula ever reaches event processing.

mod config;
mod fractions;
mod grid;
mod resolution;

pub use config::{CalorimeterConfig, EnergyFractionEntry, EtaPhiBinsEntry};
pub use fractions::{FractionTable, LayerFractions};
pub use grid::{BinGrid, CellGeometry, CellIndex};
pub use resolution::{ResolutionFormula, ResolutionTerm};

use thiserror::Error;

/// Fatal configuration errors raised while building the detector description.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum DetectorError {
    /// The grid has no eta intervals at all.
    #[error("bin grid needs at least two eta edges, got {count}")]
    TooFewEtaEdges {
        /// Number of eta edges supplied.
        count: usize,
    },
    /// An eta interval has fewer than two phi edges.
    #[error("eta bin {eta_bin} needs at least two phi edges, got {count}")]
    TooFewPhiEdges {
        /// Zero-based eta interval the short list belongs to.
        eta_bin: usize,
        /// Number of phi edges supplied.
        count: usize,
    },
    /// The number of phi-edge lists does not match the number of eta
    /// intervals.
    #[error("expected {expected} phi-edge lists for the eta intervals, got {actual}")]
    PhiListCountMismatch {
        /// Number of eta intervals in the grid.
        expected: usize,
        /// Number of phi-edge lists supplied.
        actual: usize,
    },
    /// An edge sequence is not strictly increasing.
    #[error("{axis} edges must be strictly increasing at index {index}")]
    NonMonotonicEdges {
        /// Axis the offending sequence belongs to.
        axis: &'static str,
        /// Index of the first edge that fails to increase.
        index: usize,
    },
    /// An edge value is NaN or infinite.
    #[error("{axis} edge at index {index} is not finite")]
    NonFiniteEdge {
        /// Axis the offending value belongs to.
        axis: &'static str,
        /// Index of the non-finite edge.
        index: usize,
    },
    /// An energy fraction lies outside `[0, 1]` or is not finite.
    #[error("energy fraction for species {species} is outside [0, 1]")]
    FractionOutOfRange {
        /// Absolute species code of the offending entry.
        species: u32,
    },
    /// A resolution term is malformed.
    #[error("resolution term {index} is invalid: {reason}")]
    InvalidResolutionTerm {
        /// Position of the offending term in the formula.
        index: usize,
        /// Human-readable description of the violation.
        reason: &'static str,
    },
}
