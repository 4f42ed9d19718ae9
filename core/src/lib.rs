#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the calorimeter simulation.
//!
//! This crate defines the data model that connects the event-generation
//! stage, the read-only detector description, and the per-event calorimeter
//! system. Upstream stages produce immutable [`Candidate`] collections for
//! tracks and shower particles; the calorimeter system consumes them and
//! fills an [`EventOutput`] with freshly built tower candidates. Associations
//! between outputs and inputs are expressed as index newtypes into the
//! event's input arrays, never as owning references.

use serde::{Deserialize, Serialize};

/// Particle-type code following the PDG numbering convention.
///
/// The sign encodes the charge/antiparticle state; the calorimeter only ever
/// keys on the absolute value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeciesCode(i32);

impl SpeciesCode {
    /// Electron species code.
    pub const ELECTRON: SpeciesCode = SpeciesCode(11);
    /// Muon species code.
    pub const MUON: SpeciesCode = SpeciesCode(13);
    /// Photon species code.
    pub const PHOTON: SpeciesCode = SpeciesCode(22);

    /// Creates a species code from a signed PDG value.
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Retrieves the signed PDG value.
    #[must_use]
    pub const fn get(&self) -> i32 {
        self.0
    }

    /// Absolute species code used as the fraction-table key.
    #[must_use]
    pub const fn abs_code(&self) -> u32 {
        self.0.unsigned_abs()
    }

    /// Reports whether the species showers electromagnetically.
    ///
    /// True exactly for electrons and photons.
    #[must_use]
    pub const fn is_electromagnetic(&self) -> bool {
        matches!(self.abs_code(), 11 | 22)
    }
}

/// Four-momentum expressed in collider coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FourMomentum {
    pt: f64,
    eta: f64,
    phi: f64,
    energy: f64,
}

impl FourMomentum {
    /// Creates a four-momentum from transverse momentum, pseudorapidity,
    /// azimuth, and total energy.
    #[must_use]
    pub const fn from_pt_eta_phi_energy(pt: f64, eta: f64, phi: f64, energy: f64) -> Self {
        Self {
            pt,
            eta,
            phi,
            energy,
        }
    }

    /// Transverse momentum.
    #[must_use]
    pub const fn pt(&self) -> f64 {
        self.pt
    }

    /// Pseudorapidity.
    #[must_use]
    pub const fn eta(&self) -> f64 {
        self.eta
    }

    /// Azimuthal angle in radians.
    #[must_use]
    pub const fn phi(&self) -> f64 {
        self.phi
    }

    /// Total energy.
    #[must_use]
    pub const fn energy(&self) -> f64 {
        self.energy
    }
}

/// Four-position reduced to the angular direction and arrival time.
///
/// Upstream propagation delivers positions already projected onto the
/// calorimeter surface, so only the direction and the time of flight are
/// retained. Towers are emitted with a unit-magnitude direction at the cell
/// center.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FourPosition {
    eta: f64,
    phi: f64,
    time: f64,
}

impl FourPosition {
    /// Creates a position from direction angles and arrival time.
    #[must_use]
    pub const fn new(eta: f64, phi: f64, time: f64) -> Self {
        Self { eta, phi, time }
    }

    /// Pseudorapidity of the direction.
    #[must_use]
    pub const fn eta(&self) -> f64 {
        self.eta
    }

    /// Azimuthal angle of the direction in radians.
    #[must_use]
    pub const fn phi(&self) -> f64 {
        self.phi
    }

    /// Arrival time.
    #[must_use]
    pub const fn time(&self) -> f64 {
        self.time
    }
}

/// Provenance flags carried through from event generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OriginFlags {
    /// Candidate originates from a pile-up interaction.
    pub pileup: bool,
    /// Candidate was reconstructed as pile-up.
    pub reco_pileup: bool,
}

/// Single energy-weighted timing measurement recorded for a cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingSample {
    /// Electromagnetic energy of the contributing hit.
    pub energy: f64,
    /// Arrival time of the contributing hit.
    pub time: f64,
}

/// Angular boundaries of one calorimeter cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CellEdges {
    /// Lower eta edge.
    pub eta_min: f64,
    /// Upper eta edge.
    pub eta_max: f64,
    /// Lower phi edge.
    pub phi_min: f64,
    /// Upper phi edge.
    pub phi_max: f64,
}

/// Index of a track candidate within the event's input track collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackRef(usize);

impl TrackRef {
    /// Creates a new track reference with the provided index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Retrieves the underlying collection index.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }
}

/// Index of a shower particle within the event's input particle collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticleRef(usize);

impl ParticleRef {
    /// Creates a new particle reference with the provided index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Retrieves the underlying collection index.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }
}

/// Index of a tower within an event's tower output collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerRef(usize);

impl TowerRef {
    /// Creates a new tower reference with the provided index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Retrieves the underlying collection index.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }
}

/// Generic physics object used for both inputs and calorimeter outputs.
///
/// Input candidates carry only kinematics, species, and provenance; the
/// calorimeter fields stay at their defaults. Output candidates are built
/// fresh each event, with constituents recorded as indices into the event's
/// immutable input collections.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Candidate {
    /// Four-momentum of the object.
    pub momentum: FourMomentum,
    /// Direction and time at the calorimeter surface.
    pub position: FourPosition,
    /// Particle-type code; for towers, the species tag of the last
    /// contributing particle.
    pub species: SpeciesCode,
    /// Provenance flags.
    pub origin: OriginFlags,
    /// Accumulated electromagnetic energy after smearing.
    pub eem: f64,
    /// Accumulated hadronic energy after smearing.
    pub ehad: f64,
    /// Angular boundaries of the cell this tower represents.
    pub edges: CellEdges,
    /// Energy-weighted timing contributions collected for the cell.
    pub timing_samples: Vec<TimingSample>,
    /// Shower particles that deposited energy into this tower.
    pub constituents: Vec<ParticleRef>,
    /// Tracks whose projected position fell inside this tower's cell.
    pub tower_tracks: Vec<TrackRef>,
}

impl Candidate {
    /// Creates an input candidate from kinematics and species.
    #[must_use]
    pub fn new(momentum: FourMomentum, position: FourPosition, species: SpeciesCode) -> Self {
        Self {
            momentum,
            position,
            species,
            ..Self::default()
        }
    }

    /// Number of timing samples recorded for this candidate.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.timing_samples.len()
    }
}

/// Per-event output collections filled by the calorimeter system.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventOutput {
    /// All cells with positive total smeared energy.
    pub towers: Vec<Candidate>,
    /// Towers that qualify as isolated photon candidates, as indices into
    /// [`EventOutput::towers`].
    pub photons: Vec<TowerRef>,
    /// Pass-through of every track that landed inside the grid, as indices
    /// into the event's input track collection.
    pub eflow_tracks: Vec<TrackRef>,
    /// Residual-energy towers representing calorimeter deposits not
    /// accounted for by tracks.
    pub eflow_towers: Vec<Candidate>,
}

impl EventOutput {
    /// Creates an empty output ready for the first event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all collections while keeping their allocations.
    pub fn clear(&mut self) {
        self.towers.clear();
        self.photons.clear();
        self.eflow_tracks.clear();
        self.eflow_towers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CellEdges, FourMomentum, FourPosition, OriginFlags, ParticleRef, SpeciesCode, TowerRef,
        TrackRef,
    };
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn species_code_round_trips_through_bincode() {
        assert_round_trip(&SpeciesCode::new(-211));
    }

    #[test]
    fn index_newtypes_round_trip_through_bincode() {
        assert_round_trip(&TrackRef::new(7));
        assert_round_trip(&ParticleRef::new(11));
        assert_round_trip(&TowerRef::new(3));
    }

    #[test]
    fn kinematic_types_round_trip_through_bincode() {
        assert_round_trip(&FourMomentum::from_pt_eta_phi_energy(5.0, -1.2, 0.3, 12.0));
        assert_round_trip(&FourPosition::new(0.5, -2.1, 3.4));
        assert_round_trip(&CellEdges {
            eta_min: -1.0,
            eta_max: 0.0,
            phi_min: 0.0,
            phi_max: 0.5,
        });
        assert_round_trip(&OriginFlags {
            pileup: true,
            reco_pileup: false,
        });
    }

    #[test]
    fn electrons_and_photons_are_electromagnetic() {
        assert!(SpeciesCode::ELECTRON.is_electromagnetic());
        assert!(SpeciesCode::new(-11).is_electromagnetic());
        assert!(SpeciesCode::PHOTON.is_electromagnetic());
        assert!(!SpeciesCode::MUON.is_electromagnetic());
        assert!(!SpeciesCode::new(211).is_electromagnetic());
    }

    #[test]
    fn species_abs_code_drops_the_sign() {
        assert_eq!(SpeciesCode::new(-211).abs_code(), 211);
        assert_eq!(SpeciesCode::new(22).abs_code(), 22);
    }
}
