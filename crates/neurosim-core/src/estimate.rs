// ─────────────────────────────────────────────────────────────────────
// NeuroSim — Source Estimate
// ─────────────────────────────────────────────────────────────────────
//! Dense source-space view of a set of simulated sources: one row of
//! data per occupied vertex. Sources sharing a vertex are summed, so
//! the estimate loses the per-source split by design and is only used
//! where the combined activity matters (variance estimation, export).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use neurosim_types::{Location, NeurosimError, NeurosimResult, Source, SourceSpaces};

/// Combined activity of a set of sources over the occupied vertices.
///
/// Rows are ordered by (source space, vertno), matching the column
/// order of a forward model restricted to the same vertices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEstimate {
    vertices: Vec<Vec<u64>>,
    data: Vec<f64>,
    n_samples: usize,
    sfreq: f64,
}

impl SourceEstimate {
    /// Combine `sources` into one estimate.
    ///
    /// Each source contributes its waveform scaled by its `std` to all
    /// vertices it occupies; contributions to a shared vertex add up.
    pub fn from_sources<'a, I>(
        sources: I,
        spaces: &SourceSpaces,
        sfreq: f64,
    ) -> NeurosimResult<Self>
    where
        I: IntoIterator<Item = &'a Source>,
    {
        if !sfreq.is_finite() || sfreq <= 0.0 {
            return Err(NeurosimError::Config(format!(
                "sfreq must be a positive finite number, got {sfreq}"
            )));
        }
        let sources: Vec<&Source> = sources.into_iter().collect();
        let first = sources.first().ok_or_else(|| {
            NeurosimError::Config("cannot build a source estimate from zero sources".to_string())
        })?;
        let n_samples = first.waveform.len();
        if n_samples == 0 {
            return Err(NeurosimError::Config(format!(
                "source '{}' has an empty waveform",
                first.name
            )));
        }

        let mut rows: BTreeMap<Location, Vec<f64>> = BTreeMap::new();
        for source in &sources {
            source.validate_against(spaces)?;
            if source.waveform.len() != n_samples {
                return Err(NeurosimError::Config(format!(
                    "source '{}' has {} samples while '{}' has {n_samples}; \
                     all sources must share one time grid",
                    source.name,
                    source.waveform.len(),
                    first.name
                )));
            }
            for loc in &source.vertices {
                let row = rows.entry(*loc).or_insert_with(|| vec![0.0; n_samples]);
                for (r, w) in row.iter_mut().zip(source.waveform.iter()) {
                    *r += source.std * w;
                }
            }
        }

        let mut vertices = vec![Vec::new(); spaces.n_spaces()];
        let mut data = Vec::with_capacity(rows.len() * n_samples);
        for (loc, row) in rows {
            vertices[loc.src_idx].push(loc.vertno);
            data.extend_from_slice(&row);
        }
        Ok(Self {
            vertices,
            data,
            n_samples,
            sfreq,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.vertices.iter().map(Vec::len).sum()
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn sfreq(&self) -> f64 {
        self.sfreq
    }

    pub fn vertices(&self) -> &[Vec<u64>] {
        &self.vertices
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn row(&self, idx: usize) -> &[f64] {
        &self.data[idx * self.n_samples..(idx + 1) * self.n_samples]
    }

    /// Occupied vertices in row order.
    pub fn vertex_pairs(&self) -> Vec<Location> {
        self.vertices
            .iter()
            .enumerate()
            .flat_map(|(src_idx, table)| {
                table.iter().map(move |&vertno| Location::new(src_idx, vertno))
            })
            .collect()
    }
}

// ── Tests ────────────────────────────────────────────────────────────
