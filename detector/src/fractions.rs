//! Per-species split of deposited energy between calorimeter layers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{config::EnergyFractionEntry, DetectorError};

/// Fractions of a particle's energy captured by each calorimeter layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerFractions {
    /// Fraction deposited in the electromagnetic layer.
    pub ecal: f64,
    /// Fraction deposited in the hadronic layer.
    pub hcal: f64,
}

impl LayerFractions {
    /// Creates a fraction pair.
    #[must_use]
    pub const fn new(ecal: f64, hcal: f64) -> Self {
        Self { ecal, hcal }
    }

    /// Reports whether both fractions are numerically negligible.
    #[must_use]
    pub fn is_negligible(&self) -> bool {
        self.ecal < 1.0e-9 && self.hcal < 1.0e-9
    }
}

/// Immutable map from absolute species code to layer fractions.
///
/// The entry at key 0 is the fallback for unmapped species and defaults to
/// `(0, 1)`: unknown species deposit everything hadronically unless the
/// configuration says otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct FractionTable {
    entries: HashMap<u32, LayerFractions>,
}

impl FractionTable {
    /// Builds the table from configuration entries.
    ///
    /// Entries are validated into `[0, 1]`; an entry for species 0 replaces
    /// the built-in fallback.
    pub fn from_entries(entries: &[EnergyFractionEntry]) -> Result<Self, DetectorError> {
        let mut map = HashMap::with_capacity(entries.len() + 1);
        let _ = map.insert(0, LayerFractions::new(0.0, 1.0));
        for entry in entries {
            let fractions = LayerFractions::new(entry.ecal, entry.hcal);
            if !valid_fraction(fractions.ecal) || !valid_fraction(fractions.hcal) {
                return Err(DetectorError::FractionOutOfRange {
                    species: entry.species,
                });
            }
            let _ = map.insert(entry.species, fractions);
        }
        Ok(Self { entries: map })
    }

    /// Looks up the fractions for a species, falling back to the default
    /// entry for unmapped codes.
    #[must_use]
    pub fn lookup(&self, abs_species: u32) -> LayerFractions {
        self.entries
            .get(&abs_species)
            .or_else(|| self.entries.get(&0))
            .copied()
            .unwrap_or_default()
    }
}

fn valid_fraction(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}
