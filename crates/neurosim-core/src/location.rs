// ─────────────────────────────────────────────────────────────────────
// NeuroSim — Location Sampling
// ─────────────────────────────────────────────────────────────────────
//! Candidate-location selection for simulated sources.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use neurosim_types::{Location, NeurosimError, NeurosimResult, SourceSpaces};

/// Strategy for placing a group of sources.
///
/// Implementations must return unique, in-range vertices and must be
/// deterministic for a given seed.
pub trait LocationSampler: Send + Sync {
    /// Number of locations produced per draw.
    fn n_sources(&self) -> usize;

    /// Draw the locations for one simulation run.
    fn sample(&self, spaces: &SourceSpaces, seed: u64) -> NeurosimResult<Vec<Location>>;
}

/// Draw `n` distinct vertices uniformly from all candidates.
pub fn select_random(spaces: &SourceSpaces, n: usize, seed: u64) -> NeurosimResult<Vec<Location>> {
    if n == 0 {
        return Err(NeurosimError::Config(
            "at least one location must be requested".to_string(),
        ));
    }
    let mut candidates = spaces.all_locations();
    if n > candidates.len() {
        return Err(NeurosimError::Config(format!(
            "requested {n} random locations, but the source space only contains {} vertices",
            candidates.len()
        )));
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    // Partial Fisher-Yates shuffle; only the first n slots are needed.
    for i in 0..n {
        let j = rng.gen_range(i..candidates.len());
        candidates.swap(i, j);
    }
    candidates.truncate(n);
    Ok(candidates)
}

/// Uniform sampling of `n` distinct source locations.
#[derive(Debug, Clone, Copy)]
pub struct RandomLocations {
    pub n: usize,
}

impl LocationSampler for RandomLocations {
    fn n_sources(&self) -> usize {
        self.n
    }

    fn sample(&self, spaces: &SourceSpaces, seed: u64) -> NeurosimResult<Vec<Location>> {
        select_random(spaces, self.n, seed)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn make_spaces() -> SourceSpaces {
        SourceSpaces::new(vec![(0..50).collect(), (0..50).collect()])
    }

    #[test]
    fn test_sampled_locations_are_unique_and_in_range() {
        let spaces = make_spaces();
        let locations = select_random(&spaces, 30, 7).unwrap();
        assert_eq!(locations.len(), 30);
        let distinct: BTreeSet<Location> = locations.iter().copied().collect();
        assert_eq!(distinct.len(), 30, "duplicates drawn");
        assert!(locations.iter().all(|&l| spaces.contains(l)));
    }

    #[test]
    fn test_deterministic_per_seed() {
        let spaces = make_spaces();
        let first = select_random(&spaces, 10, 42).unwrap();
        let again = select_random(&spaces, 10, 42).unwrap();
        assert_eq!(first, again);

        let other = select_random(&spaces, 10, 43).unwrap();
        assert_ne!(first, other, "another seed should move the draw");
    }

    #[test]
    fn test_drawing_all_vertices_is_a_permutation() {
        let spaces = make_spaces();
        let mut locations = select_random(&spaces, 100, 3).unwrap();
        locations.sort_unstable();
        assert_eq!(locations, spaces.all_locations());
    }

    #[test]
    fn test_request_bounds() {
        let spaces = make_spaces();
        assert!(select_random(&spaces, 0, 1).is_err(), "zero requested");
        let err = select_random(&spaces, 101, 1).unwrap_err();
        assert!(
            matches!(err, NeurosimError::Config(msg) if msg.contains("101")),
            "too many requested"
        );
    }

    #[test]
    fn test_sampler_reports_its_size() {
        let sampler = RandomLocations { n: 5 };
        assert_eq!(sampler.n_sources(), 5);
        let spaces = make_spaces();
        assert_eq!(sampler.sample(&spaces, 9).unwrap().len(), 5);
    }
}
