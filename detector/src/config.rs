//! Run configuration consumed once at initialization.

use serde::{Deserialize, Serialize};

use crate::ResolutionTerm;

/// One segmentation entry: a set of eta edges that all share the same phi
/// segmentation.
///
/// Entries may overlap; the grid merges them with edges sorted and
/// deduplicated.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EtaPhiBinsEntry {
    /// Eta edges contributed by this entry.
    pub eta_edges: Vec<f64>,
    /// Phi edges attached to every listed eta edge.
    pub phi_edges: Vec<f64>,
}

/// Energy split for one species.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyFractionEntry {
    /// Absolute species code; 0 replaces the fallback entry.
    pub species: u32,
    /// Fraction captured by the electromagnetic layer.
    pub ecal: f64,
    /// Fraction captured by the hadronic layer.
    pub hcal: f64,
}

/// Complete calorimeter configuration, fixed for the run.
///
/// This is plain data: reading it from disk in whatever serde format the
/// host pipeline prefers is the host's concern. Validation happens when the
/// detector description and the calorimeter system are built from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalorimeterConfig {
    /// Segmentation entries merged into the bin grid.
    pub eta_phi_bins: Vec<EtaPhiBinsEntry>,
    /// Per-species energy splits.
    pub energy_fractions: Vec<EnergyFractionEntry>,
    /// Resolution terms for the electromagnetic layer.
    #[serde(default)]
    pub ecal_resolution: Vec<ResolutionTerm>,
    /// Resolution terms for the hadronic layer.
    #[serde(default)]
    pub hcal_resolution: Vec<ResolutionTerm>,
    /// Minimum electromagnetic hit energy for a timing sample.
    #[serde(default = "default_timing_energy_min")]
    pub timing_energy_min: f64,
    /// Whether electron energy is modeled as arriving via the track channel.
    #[serde(default)]
    pub electrons_from_track: bool,
}

impl Default for CalorimeterConfig {
    fn default() -> Self {
        Self {
            eta_phi_bins: Vec::new(),
            energy_fractions: Vec::new(),
            ecal_resolution: Vec::new(),
            hcal_resolution: Vec::new(),
            timing_energy_min: default_timing_energy_min(),
            electrons_from_track: false,
        }
    }
}

fn default_timing_energy_min() -> f64 {
    4.0
}
