#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-event calorimeter system.
//!
//! Consumes the event's track and shower-particle collections, encodes every
//! in-acceptance hit into a packed sort key, streams the sorted keys once,
//! and emits, per cell: a tower candidate, optionally a photon candidate,
//! the constituent tracks, and a residual energy-flow tower. All per-event
//! state lives in scratch buffers owned by [`Calorimeter`] and is reset at
//! the start of each event; the detector description is read-only.

mod hit;

use calo_sim_core::{
    Candidate, CellEdges, EventOutput, FourMomentum, FourPosition, OriginFlags, ParticleRef,
    SpeciesCode, TimingSample, TowerRef, TrackRef,
};
use calo_sim_detector::{
    BinGrid, CalorimeterConfig, CellGeometry, DetectorError, FractionTable, LayerFractions,
    ResolutionFormula,
};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::hit::{TowerHit, FLAG_EM, FLAG_TRACK};

/// Time assigned to a tower with no timing samples.
///
/// Deliberately far from any physical time of flight so that downstream
/// consumers can tell "unknown" apart from a genuine zero.
pub const UNKNOWN_TIME: f64 = 999_999.0;

/// Fraction-table entry cached per input candidate, keyed by its index.
#[derive(Clone, Copy, Debug)]
struct SideEntry {
    fractions: LayerFractions,
    species: SpeciesCode,
}

/// Accumulator state of the cell currently being filled.
#[derive(Debug)]
struct ActiveTower {
    cell_key: u64,
    eta: f64,
    phi: f64,
    edges: CellEdges,
    ecal: f64,
    hcal: f64,
    track_ecal: f64,
    track_hcal: f64,
    track_hits: usize,
    em_hits: usize,
    species: SpeciesCode,
    timing: Vec<TimingSample>,
    constituents: Vec<ParticleRef>,
    tracks: Vec<TrackRef>,
}

impl ActiveTower {
    fn open(cell_key: u64, geometry: CellGeometry) -> Self {
        Self {
            cell_key,
            eta: geometry.eta,
            phi: geometry.phi,
            edges: geometry.edges,
            ecal: 0.0,
            hcal: 0.0,
            track_ecal: 0.0,
            track_hcal: 0.0,
            track_hits: 0,
            em_hits: 0,
            species: SpeciesCode::default(),
            timing: Vec::new(),
            constituents: Vec::new(),
            tracks: Vec::new(),
        }
    }
}

/// Segmented-calorimeter response system.
///
/// Built once per run from a validated [`CalorimeterConfig`]; processes one
/// event at a time through [`Calorimeter::process`].
#[derive(Debug)]
pub struct Calorimeter {
    grid: BinGrid,
    fractions: FractionTable,
    ecal_resolution: ResolutionFormula,
    hcal_resolution: ResolutionFormula,
    timing_energy_min: f64,
    electrons_from_track: bool,
    hits: Vec<TowerHit>,
    track_table: Vec<SideEntry>,
    particle_table: Vec<SideEntry>,
}

impl Calorimeter {
    /// Builds the system from configuration.
    ///
    /// Fails fast on a malformed grid, fraction table, or resolution
    /// parameterization; no degenerate detector ever processes an event.
    pub fn new(config: &CalorimeterConfig) -> Result<Self, DetectorError> {
        Ok(Self {
            grid: BinGrid::from_entries(&config.eta_phi_bins)?,
            fractions: FractionTable::from_entries(&config.energy_fractions)?,
            ecal_resolution: ResolutionFormula::new(config.ecal_resolution.clone())?,
            hcal_resolution: ResolutionFormula::new(config.hcal_resolution.clone())?,
            timing_energy_min: config.timing_energy_min,
            electrons_from_track: config.electrons_from_track,
            hits: Vec::new(),
            track_table: Vec::new(),
            particle_table: Vec::new(),
        })
    }

    /// Read-only view of the bin grid this system was built with.
    #[must_use]
    pub fn grid(&self) -> &BinGrid {
        &self.grid
    }

    /// Processes one event, filling `out` with fresh output collections.
    ///
    /// Tracks are encoded before particles; within a cell, accumulation
    /// order does not affect the result because track and particle energies
    /// run in independent sums that only combine at finalization. Positions
    /// outside the grid contribute nothing; their fraction-table entries are
    /// still recorded so per-index lookups stay valid.
    pub fn process<R: Rng>(
        &mut self,
        tracks: &[Candidate],
        particles: &[Candidate],
        rng: &mut R,
        out: &mut EventOutput,
    ) {
        out.clear();
        self.hits.clear();
        self.track_table.clear();
        self.particle_table.clear();

        for (index, track) in tracks.iter().enumerate() {
            let fractions = self.fractions.lookup(track.species.abs_code());
            self.track_table.push(SideEntry {
                fractions,
                species: track.species,
            });
            if let Some(cell) = self.grid.locate(track.position.eta(), track.position.phi()) {
                self.hits.push(TowerHit::pack(cell, FLAG_TRACK, index));
            }
        }

        for (index, particle) in particles.iter().enumerate() {
            let fractions = self.fractions.lookup(particle.species.abs_code());
            self.particle_table.push(SideEntry {
                fractions,
                species: particle.species,
            });
            if fractions.is_negligible() {
                continue;
            }
            if let Some(cell) = self
                .grid
                .locate(particle.position.eta(), particle.position.phi())
            {
                let flags = if particle.species.is_electromagnetic() {
                    FLAG_EM
                } else {
                    0
                };
                self.hits.push(TowerHit::pack(cell, flags, index));
            }
        }

        self.hits.sort_unstable();

        let mut active: Option<ActiveTower> = None;
        for &hit in &self.hits {
            let cell_changed = active
                .as_ref()
                .map_or(true, |tower| tower.cell_key != hit.cell_key());
            if cell_changed {
                if let Some(tower) = active.take() {
                    self.finalize_tower(tower, rng, out);
                }
                active = self
                    .grid
                    .cell_geometry(hit.cell())
                    .map(|geometry| ActiveTower::open(hit.cell_key(), geometry));
            }
            let Some(tower) = active.as_mut() else {
                continue;
            };

            if hit.is_track() {
                let track = &tracks[hit.index()];
                let entry = &self.track_table[hit.index()];
                let ecal_energy = track.momentum.energy() * entry.fractions.ecal;
                let hcal_energy = track.momentum.energy() * entry.fractions.hcal;
                tower.track_hits += 1;
                tower.track_ecal += ecal_energy;
                tower.track_hcal += hcal_energy;
                if ecal_energy > self.timing_energy_min {
                    tower.timing.push(TimingSample {
                        energy: ecal_energy,
                        time: track.position.time(),
                    });
                }
                tower.tracks.push(TrackRef::new(hit.index()));
            } else {
                let particle = &particles[hit.index()];
                let entry = &self.particle_table[hit.index()];
                let ecal_energy = particle.momentum.energy() * entry.fractions.ecal;
                let hcal_energy = particle.momentum.energy() * entry.fractions.hcal;
                if hit.is_electromagnetic() {
                    tower.em_hits += 1;
                }
                tower.ecal += ecal_energy;
                tower.hcal += hcal_energy;
                let electron_via_track = self.electrons_from_track
                    && entry.species.abs_code() == SpeciesCode::ELECTRON.abs_code();
                if ecal_energy > self.timing_energy_min && !electron_via_track {
                    tower.timing.push(TimingSample {
                        energy: ecal_energy,
                        time: particle.position.time(),
                    });
                }
                // Last writer wins; only meaningful for single-dominant
                // particle cells.
                tower.species = entry.species;
                tower.constituents.push(ParticleRef::new(hit.index()));
            }
        }

        if let Some(tower) = active.take() {
            self.finalize_tower(tower, rng, out);
        }
    }

    /// Smears, times, and classifies one finished cell.
    fn finalize_tower<R: Rng>(&self, tower: ActiveTower, rng: &mut R, out: &mut EventOutput) {
        let ecal_sigma = self.ecal_resolution.evaluate(tower.eta, tower.ecal);
        let ecal_energy = log_normal(tower.ecal, ecal_sigma, rng);
        let hcal_sigma = self.hcal_resolution.evaluate(tower.eta, tower.hcal);
        let hcal_energy = log_normal(tower.hcal, hcal_sigma, rng);
        let energy = ecal_energy + hcal_energy;

        let mut weighted_time = 0.0;
        let mut weight_sum = 0.0;
        for sample in &tower.timing {
            let weight = sample.energy.sqrt();
            weighted_time += weight * sample.time;
            weight_sum += weight;
        }
        let time = if weight_sum > 0.0 {
            weighted_time / weight_sum
        } else {
            UNKNOWN_TIME
        };

        // Constituent tracks pass through even when the cell reads zero.
        out.eflow_tracks.extend(tower.tracks.iter().copied());

        let residual_ecal = (ecal_energy - tower.track_ecal).max(0.0);
        let residual_hcal = (hcal_energy - tower.track_hcal).max(0.0);
        let residual = residual_ecal + residual_hcal;

        let em_hits = tower.em_hits;
        let track_hits = tower.track_hits;
        let candidate = Candidate {
            momentum: FourMomentum::from_pt_eta_phi_energy(
                energy / tower.eta.cosh(),
                tower.eta,
                tower.phi,
                energy,
            ),
            position: FourPosition::new(tower.eta, tower.phi, time),
            species: tower.species,
            origin: OriginFlags::default(),
            eem: ecal_energy,
            ehad: hcal_energy,
            edges: tower.edges,
            timing_samples: tower.timing,
            constituents: tower.constituents,
            tower_tracks: tower.tracks,
        };

        if residual > 0.0 {
            let mut eflow = candidate.clone();
            eflow.momentum = FourMomentum::from_pt_eta_phi_energy(
                residual / tower.eta.cosh(),
                tower.eta,
                tower.phi,
                residual,
            );
            eflow.eem = residual_ecal;
            eflow.ehad = residual_hcal;
            out.eflow_towers.push(eflow);
        }

        if energy > 0.0 {
            if em_hits > 0 && track_hits == 0 {
                out.photons.push(TowerRef::new(out.towers.len()));
            }
            out.towers.push(candidate);
        }
    }
}

/// Draws a log-normally distributed energy preserving the accumulated mean.
///
/// A normal variate is consumed whenever `mean > 0`, even at zero width, so
/// the random stream does not depend on the configured resolution.
fn log_normal<R: Rng>(mean: f64, sigma: f64, rng: &mut R) -> f64 {
    if mean > 0.0 {
        let b = (1.0 + (sigma * sigma) / (mean * mean)).ln().sqrt();
        let a = mean.ln() - 0.5 * b * b;
        (a + b * standard_normal(rng)).exp()
    } else {
        0.0
    }
}

/// Standard normal draw via the Box-Muller transform.
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u: f64 = 1.0 - rng.gen::<f64>();
    let v: f64 = rng.gen();
    (-2.0 * u.ln()).sqrt() * (std::f64::consts::TAU * v).cos()
}

/// Derives the RNG seed for one event from the run seed and event number.
///
/// Events draw from independent reproducible streams, so event N can be
/// re-simulated in isolation.
#[must_use]
pub fn derive_event_seed(run_seed: u64, event: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(run_seed.to_le_bytes());
    hasher.update(event.to_le_bytes());
    let digest = hasher.finalize();
    let bytes: [u8; 8] = digest[0..8].try_into().expect("sha256 digest slice length");
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::{derive_event_seed, log_normal, standard_normal};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn zero_width_log_normal_degenerates_to_the_mean() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let drawn = log_normal(10.0, 0.0, &mut rng);
        assert!((drawn - 10.0).abs() < 1.0e-9, "drawn {drawn}");
    }

    #[test]
    fn non_positive_mean_clamps_to_zero() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(log_normal(0.0, 1.0, &mut rng), 0.0);
        assert_eq!(log_normal(-3.0, 1.0, &mut rng), 0.0);
    }

    #[test]
    fn log_normal_sample_mean_tracks_the_target_mean() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let target = 50.0;
        let sigma = 5.0;
        let draws = 20_000;
        let sum: f64 = (0..draws).map(|_| log_normal(target, sigma, &mut rng)).sum();
        let mean = sum / f64::from(draws);
        assert!((mean - target).abs() < 0.5, "sample mean {mean}");
    }

    #[test]
    fn standard_normal_is_roughly_centered() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let draws = 20_000;
        let sum: f64 = (0..draws).map(|_| standard_normal(&mut rng)).sum();
        assert!((sum / f64::from(draws)).abs() < 0.05);
    }

    #[test]
    fn event_seeds_are_stable_and_distinct() {
        assert_eq!(derive_event_seed(1, 2), derive_event_seed(1, 2));
        assert_ne!(derive_event_seed(1, 2), derive_event_seed(1, 3));
        assert_ne!(derive_event_seed(1, 2), derive_event_seed(2, 2));
    }
}
