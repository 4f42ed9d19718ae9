//! Non-uniform eta/phi segmentation of the calorimeter surface.

use calo_sim_core::CellEdges;

use crate::{config::EtaPhiBinsEntry, DetectorError};

/// Location of one calorimeter cell expressed as upper-edge indices.
///
/// Both indices are at least 1 and fit in 16 bits, which is what lets the hit
/// encoder pack a cell into the top half of a 64-bit sort key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellIndex {
    eta: u16,
    phi: u16,
}

impl CellIndex {
    /// Creates a cell index from upper-edge indices.
    #[must_use]
    pub const fn new(eta: u16, phi: u16) -> Self {
        Self { eta, phi }
    }

    /// Upper eta-edge index of the cell.
    #[must_use]
    pub const fn eta(&self) -> u16 {
        self.eta
    }

    /// Upper phi-edge index of the cell.
    #[must_use]
    pub const fn phi(&self) -> u16 {
        self.phi
    }
}

/// Center and boundaries of one calorimeter cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellGeometry {
    /// Eta of the cell center (midpoint of the eta edges).
    pub eta: f64,
    /// Phi of the cell center (midpoint of the phi edges).
    pub phi: f64,
    /// The four angular boundaries of the cell.
    pub edges: CellEdges,
}

/// Immutable eta/phi bin grid with per-ring phi segmentation.
///
/// Bins are strictly interior to the configured edges: a coordinate at or
/// outside the outermost edges maps to no cell.
#[derive(Clone, Debug, PartialEq)]
pub struct BinGrid {
    eta_edges: Vec<f64>,
    phi_edges: Vec<Vec<f64>>,
}

impl BinGrid {
    /// Builds a grid from explicit edge lists.
    ///
    /// `phi_edges` must hold one list per eta interval, i.e. one fewer than
    /// the number of eta edges. All edge sequences must be finite and
    /// strictly increasing.
    pub fn new(eta_edges: Vec<f64>, phi_edges: Vec<Vec<f64>>) -> Result<Self, DetectorError> {
        if eta_edges.len() < 2 {
            return Err(DetectorError::TooFewEtaEdges {
                count: eta_edges.len(),
            });
        }
        validate_edges("eta", &eta_edges)?;
        if phi_edges.len() != eta_edges.len() - 1 {
            return Err(DetectorError::PhiListCountMismatch {
                expected: eta_edges.len() - 1,
                actual: phi_edges.len(),
            });
        }
        for (eta_bin, edges) in phi_edges.iter().enumerate() {
            if edges.len() < 2 {
                return Err(DetectorError::TooFewPhiEdges {
                    eta_bin,
                    count: edges.len(),
                });
            }
            validate_edges("phi", edges)?;
        }
        Ok(Self {
            eta_edges,
            phi_edges,
        })
    }

    /// Builds a grid by merging configuration entries.
    ///
    /// Every eta edge listed in an entry receives every phi edge of that
    /// entry; overlapping entries merge, with edges sorted and deduplicated.
    /// An eta interval inherits the phi edges attached to its upper eta edge.
    pub fn from_entries(entries: &[EtaPhiBinsEntry]) -> Result<Self, DetectorError> {
        let mut merged: Vec<(f64, Vec<f64>)> = Vec::new();
        for entry in entries {
            for &eta_edge in &entry.eta_edges {
                let phi_set = match merged
                    .binary_search_by(|(edge, _)| edge.total_cmp(&eta_edge))
                {
                    Ok(found) => &mut merged[found].1,
                    Err(slot) => {
                        merged.insert(slot, (eta_edge, Vec::new()));
                        &mut merged[slot].1
                    }
                };
                for &phi_edge in &entry.phi_edges {
                    if let Err(slot) =
                        phi_set.binary_search_by(|edge| edge.total_cmp(&phi_edge))
                    {
                        phi_set.insert(slot, phi_edge);
                    }
                }
            }
        }

        let eta_edges: Vec<f64> = merged.iter().map(|(edge, _)| *edge).collect();
        let phi_edges: Vec<Vec<f64>> = merged
            .iter()
            .skip(1)
            .map(|(_, phi_set)| phi_set.clone())
            .collect();
        Self::new(eta_edges, phi_edges)
    }

    /// Maps a position to its cell, or `None` for positions at or outside
    /// the outer edges.
    ///
    /// A coordinate exactly on an interior edge resolves to the lower bin.
    #[must_use]
    pub fn locate(&self, eta: f64, phi: f64) -> Option<CellIndex> {
        let eta_upper = upper_edge(&self.eta_edges, eta)?;
        let phi_upper = upper_edge(&self.phi_edges[eta_upper - 1], phi)?;
        Some(CellIndex::new(eta_upper as u16, phi_upper as u16))
    }

    /// Returns the center and boundaries of a cell, or `None` when the index
    /// does not belong to this grid.
    #[must_use]
    pub fn cell_geometry(&self, cell: CellIndex) -> Option<CellGeometry> {
        let eta_upper = usize::from(cell.eta());
        let phi_upper = usize::from(cell.phi());
        if eta_upper == 0 || eta_upper >= self.eta_edges.len() {
            return None;
        }
        let phi_edges = &self.phi_edges[eta_upper - 1];
        if phi_upper == 0 || phi_upper >= phi_edges.len() {
            return None;
        }
        let edges = CellEdges {
            eta_min: self.eta_edges[eta_upper - 1],
            eta_max: self.eta_edges[eta_upper],
            phi_min: phi_edges[phi_upper - 1],
            phi_max: phi_edges[phi_upper],
        };
        Some(CellGeometry {
            eta: 0.5 * (edges.eta_min + edges.eta_max),
            phi: 0.5 * (edges.phi_min + edges.phi_max),
            edges,
        })
    }

    /// Ordered eta edges of the grid.
    #[must_use]
    pub fn eta_edges(&self) -> &[f64] {
        &self.eta_edges
    }

    /// Ordered phi edges of the given eta interval.
    #[must_use]
    pub fn phi_edges(&self, eta_bin: usize) -> &[f64] {
        &self.phi_edges[eta_bin]
    }

    /// Number of eta intervals in the grid.
    #[must_use]
    pub fn eta_bin_count(&self) -> usize {
        self.eta_edges.len() - 1
    }
}

fn validate_edges(axis: &'static str, edges: &[f64]) -> Result<(), DetectorError> {
    for (index, edge) in edges.iter().enumerate() {
        if !edge.is_finite() {
            return Err(DetectorError::NonFiniteEdge { axis, index });
        }
        if index > 0 && edges[index - 1] >= *edge {
            return Err(DetectorError::NonMonotonicEdges { axis, index });
        }
    }
    Ok(())
}

/// Finds the upper-edge index of the bin containing `value`.
///
/// Returns `None` when `value` is at or outside the outermost edges; ties at
/// interior edges resolve to the lower bin.
fn upper_edge(edges: &[f64], value: f64) -> Option<usize> {
    if !(value > edges[0] && value < edges[edges.len() - 1]) {
        return None;
    }
    Some(edges.partition_point(|&edge| edge < value))
}
