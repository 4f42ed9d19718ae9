//! Packed 64-bit sort keys for calorimeter hits.
//!
//! Layout, most significant to least significant: 16 bits of eta-bin index,
//! 16 bits of phi-bin index, 8 bits of flags, 24 bits of candidate index.
//! Sorting the keys groups hits by cell, separates hit kinds within a cell,
//! and preserves input order as a stable tie-break.

use calo_sim_detector::CellIndex;

const CELL_SHIFT: u32 = 32;
const ETA_SHIFT: u32 = 48;
const FLAG_SHIFT: u32 = 24;
const INDEX_MASK: u64 = 0x00FF_FFFF;
const FLAG_MASK: u64 = 0xFF;
const BIN_MASK: u64 = 0xFFFF;

/// Flag bit marking a charged-track hit.
pub(crate) const FLAG_TRACK: u8 = 0b01;
/// Flag bit marking an electromagnetic shower-particle hit.
pub(crate) const FLAG_EM: u8 = 0b10;

/// Largest candidate index that fits in the 24-bit field.
pub(crate) const MAX_CANDIDATE_INDEX: usize = INDEX_MASK as usize;

/// One encoded calorimeter hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct TowerHit(u64);

impl TowerHit {
    /// Packs a cell, flag set, and candidate index into a sortable key.
    pub(crate) fn pack(cell: CellIndex, flags: u8, index: usize) -> Self {
        debug_assert!(index <= MAX_CANDIDATE_INDEX, "candidate index overflow");
        Self(
            (u64::from(cell.eta()) << ETA_SHIFT)
                | (u64::from(cell.phi()) << CELL_SHIFT)
                | (u64::from(flags) << FLAG_SHIFT)
                | (index as u64 & INDEX_MASK),
        )
    }

    /// Upper 32 bits identifying the cell; equal keys share a cell.
    pub(crate) fn cell_key(self) -> u64 {
        self.0 >> CELL_SHIFT
    }

    /// Cell the hit landed in.
    pub(crate) fn cell(self) -> CellIndex {
        CellIndex::new(
            ((self.0 >> ETA_SHIFT) & BIN_MASK) as u16,
            ((self.0 >> CELL_SHIFT) & BIN_MASK) as u16,
        )
    }

    /// Index of the originating candidate in its input collection.
    pub(crate) fn index(self) -> usize {
        (self.0 & INDEX_MASK) as usize
    }

    /// Whether the hit comes from a charged track.
    pub(crate) fn is_track(self) -> bool {
        (self.0 >> FLAG_SHIFT) & FLAG_MASK & u64::from(FLAG_TRACK) != 0
    }

    /// Whether the hit carries the electromagnetic flag.
    pub(crate) fn is_electromagnetic(self) -> bool {
        (self.0 >> FLAG_SHIFT) & FLAG_MASK & u64::from(FLAG_EM) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::{TowerHit, FLAG_EM, FLAG_TRACK};
    use calo_sim_detector::CellIndex;

    #[test]
    fn fields_survive_packing() {
        let hit = TowerHit::pack(CellIndex::new(17, 1023), FLAG_EM, 0x00AB_CDEF);
        assert_eq!(hit.cell(), CellIndex::new(17, 1023));
        assert_eq!(hit.index(), 0x00AB_CDEF);
        assert!(hit.is_electromagnetic());
        assert!(!hit.is_track());
    }

    #[test]
    fn sorting_groups_by_cell_before_flags_and_index() {
        let mut hits = vec![
            TowerHit::pack(CellIndex::new(2, 1), 0, 0),
            TowerHit::pack(CellIndex::new(1, 2), FLAG_EM, 4),
            TowerHit::pack(CellIndex::new(1, 2), FLAG_TRACK, 9),
            TowerHit::pack(CellIndex::new(1, 1), FLAG_TRACK, 3),
            TowerHit::pack(CellIndex::new(1, 2), FLAG_TRACK, 2),
        ];
        hits.sort_unstable();
        let cells: Vec<_> = hits.iter().map(|hit| hit.cell()).collect();
        assert_eq!(
            cells,
            vec![
                CellIndex::new(1, 1),
                CellIndex::new(1, 2),
                CellIndex::new(1, 2),
                CellIndex::new(1, 2),
                CellIndex::new(2, 1),
            ],
        );
        // Within a cell, track hits precede electromagnetic ones and input
        // order breaks ties.
        assert_eq!(hits[1].index(), 2);
        assert_eq!(hits[2].index(), 9);
        assert!(hits[3].is_electromagnetic());
    }
}
