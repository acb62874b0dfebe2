// ─────────────────────────────────────────────────────────────────────
// NeuroSim — Source Data Model
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{NeurosimError, NeurosimResult};

/// Position of one simulated dipole: a vertex within a source space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Index of the source space (e.g. 0 = left hemisphere, 1 = right).
    pub src_idx: usize,
    /// Vertex number within that source space.
    pub vertno: u64,
}

impl Location {
    pub fn new(src_idx: usize, vertno: u64) -> Self {
        Self { src_idx, vertno }
    }
}

/// Anatomical support of a simulation: one vertex table per source space.
///
/// Vertex numbers must be strictly increasing within each space, matching
/// the ordering of forward-model columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpaces {
    pub vertices: Vec<Vec<u64>>,
}

impl SourceSpaces {
    pub fn new(vertices: Vec<Vec<u64>>) -> Self {
        Self { vertices }
    }

    /// Validate the vertex tables.
    pub fn validate(&self) -> NeurosimResult<()> {
        if self.vertices.is_empty() {
            return Err(NeurosimError::Config(
                "source spaces must contain at least one vertex table".to_string(),
            ));
        }
        for (src_idx, table) in self.vertices.iter().enumerate() {
            if table.is_empty() {
                return Err(NeurosimError::Config(format!(
                    "source space {src_idx} has no vertices"
                )));
            }
            if !table.windows(2).all(|w| w[0] < w[1]) {
                return Err(NeurosimError::Config(format!(
                    "vertex table of source space {src_idx} must be strictly increasing"
                )));
            }
        }
        Ok(())
    }

    pub fn n_spaces(&self) -> usize {
        self.vertices.len()
    }

    /// Total number of vertices across all spaces.
    pub fn n_vertices(&self) -> usize {
        self.vertices.iter().map(Vec::len).sum()
    }

    /// Whether `loc` names an existing vertex.
    pub fn contains(&self, loc: Location) -> bool {
        self.vertices
            .get(loc.src_idx)
            .is_some_and(|table| table.binary_search(&loc.vertno).is_ok())
    }

    /// All vertices in (src_idx, vertno) order.
    pub fn all_locations(&self) -> Vec<Location> {
        self.vertices
            .iter()
            .enumerate()
            .flat_map(|(src_idx, table)| {
                table.iter().map(move |&vertno| Location::new(src_idx, vertno))
            })
            .collect()
    }
}

/// One simulated source of brain activity.
///
/// A point source occupies a single vertex; a patch source spreads the
/// same waveform over several vertices. `std` scales the waveform when
/// the source is projected into a source estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Unique name within one simulation.
    pub name: String,
    /// Occupied vertices; exactly one for a point source.
    pub vertices: Vec<Location>,
    /// Activity time course, one value per sample.
    pub waveform: Vec<f64>,
    /// Standard-deviation scale factor applied when projecting.
    pub std: f64,
}

impl Source {
    pub fn new(name: String, vertices: Vec<Location>, waveform: Vec<f64>, std: f64) -> Self {
        Self {
            name,
            vertices,
            waveform,
            std,
        }
    }

    pub fn point(name: String, location: Location, waveform: Vec<f64>) -> Self {
        Self::new(name, vec![location], waveform, 1.0)
    }

    #[inline]
    pub fn is_point(&self) -> bool {
        self.vertices.len() == 1
    }

    /// Check that every vertex of this source exists in `spaces`.
    pub fn validate_against(&self, spaces: &SourceSpaces) -> NeurosimResult<()> {
        if self.vertices.is_empty() {
            return Err(NeurosimError::Config(format!(
                "source '{}' occupies no vertices",
                self.name
            )));
        }
        for loc in &self.vertices {
            if !spaces.contains(*loc) {
                return Err(NeurosimError::Config(format!(
                    "source '{}' references vertex {} of source space {}, which does not exist",
                    self.name, loc.vertno, loc.src_idx
                )));
            }
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_spaces() -> SourceSpaces {
        SourceSpaces::new(vec![vec![0, 10, 20, 30], vec![5, 15, 25]])
    }

    #[test]
    fn test_spaces_validation() {
        assert!(make_spaces().validate().is_ok());
        assert!(SourceSpaces::new(vec![]).validate().is_err(), "empty rejected");
        assert!(
            SourceSpaces::new(vec![vec![]]).validate().is_err(),
            "empty table rejected"
        );
        assert!(
            SourceSpaces::new(vec![vec![3, 1, 2]]).validate().is_err(),
            "unsorted table rejected"
        );
        assert!(
            SourceSpaces::new(vec![vec![1, 1, 2]]).validate().is_err(),
            "duplicate vertex rejected"
        );
    }

    #[test]
    fn test_spaces_lookup() {
        let spaces = make_spaces();
        assert_eq!(spaces.n_spaces(), 2);
        assert_eq!(spaces.n_vertices(), 7);
        assert!(spaces.contains(Location::new(0, 20)));
        assert!(spaces.contains(Location::new(1, 5)));
        assert!(!spaces.contains(Location::new(0, 5)), "vertno of wrong space");
        assert!(!spaces.contains(Location::new(2, 0)), "space out of range");
    }

    #[test]
    fn test_all_locations_ordered() {
        let locs = make_spaces().all_locations();
        assert_eq!(locs.len(), 7);
        assert_eq!(locs[0], Location::new(0, 0));
        assert_eq!(locs[4], Location::new(1, 5));
        assert!(locs.windows(2).all(|w| w[0] < w[1]), "lexicographic order");
    }

    #[test]
    fn test_source_validate_against() {
        let spaces = make_spaces();
        let good = Source::point("s1".to_string(), Location::new(0, 10), vec![0.0; 4]);
        assert!(good.validate_against(&spaces).is_ok());

        let bad = Source::point("s2".to_string(), Location::new(0, 11), vec![0.0; 4]);
        assert!(bad.validate_against(&spaces).is_err(), "vertex 11 not in space 0");

        let empty = Source::new("s3".to_string(), vec![], vec![0.0; 4], 1.0);
        assert!(empty.validate_against(&spaces).is_err(), "no vertices");
    }
}
