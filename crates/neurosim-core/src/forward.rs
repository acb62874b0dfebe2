// ─────────────────────────────────────────────────────────────────────
// NeuroSim — Forward Model
// ─────────────────────────────────────────────────────────────────────
//! In-memory forward (leadfield) operator. Only the restriction to
//! simulated vertices is exposed; raw sensor-space projection stays
//! with the surrounding pipeline.

use serde::{Deserialize, Serialize};

use neurosim_types::{Location, NeurosimError, NeurosimResult};

/// Gain matrix of a forward solution together with the vertex tables
/// that label its columns.
///
/// `gain` is row-major with shape (n_sensors, total vertices); columns
/// follow the vertex tables space by space, each in increasing vertno
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardModel {
    gain: Vec<f64>,
    n_sensors: usize,
    vertices: Vec<Vec<u64>>,
    offsets: Vec<usize>,
}

impl ForwardModel {
    pub fn new(gain: Vec<f64>, n_sensors: usize, vertices: Vec<Vec<u64>>) -> NeurosimResult<Self> {
        if n_sensors == 0 {
            return Err(NeurosimError::Config(
                "a forward model needs at least one sensor".to_string(),
            ));
        }
        if vertices.is_empty() {
            return Err(NeurosimError::Config(
                "a forward model needs at least one vertex table".to_string(),
            ));
        }
        for (src_idx, table) in vertices.iter().enumerate() {
            if !table.windows(2).all(|w| w[0] < w[1]) {
                return Err(NeurosimError::Config(format!(
                    "vertex table of source space {src_idx} must be strictly increasing"
                )));
            }
        }
        let mut offsets = Vec::with_capacity(vertices.len());
        let mut total = 0usize;
        for table in &vertices {
            offsets.push(total);
            total += table.len();
        }
        if total == 0 {
            return Err(NeurosimError::Config(
                "a forward model needs at least one source vertex".to_string(),
            ));
        }
        if gain.len() != n_sensors * total {
            return Err(NeurosimError::Config(format!(
                "gain matrix size {} does not match {n_sensors} sensors x {total} vertices",
                gain.len()
            )));
        }
        if !gain.iter().all(|g| g.is_finite()) {
            return Err(NeurosimError::Config(
                "gain matrix contains non-finite values".to_string(),
            ));
        }
        Ok(Self {
            gain,
            n_sensors,
            vertices,
            offsets,
        })
    }

    pub fn n_sensors(&self) -> usize {
        self.n_sensors
    }

    pub fn n_columns(&self) -> usize {
        self.vertices.iter().map(Vec::len).sum()
    }

    pub fn vertices(&self) -> &[Vec<u64>] {
        &self.vertices
    }

    /// Column index of the given vertex, if the model covers it.
    pub fn column_of(&self, loc: Location) -> Option<usize> {
        let table = self.vertices.get(loc.src_idx)?;
        let pos = table.binary_search(&loc.vertno).ok()?;
        Some(self.offsets[loc.src_idx] + pos)
    }

    /// Extract the leadfield columns for the given vertices, in the
    /// given order. Returns a row-major (n_sensors, locations) matrix.
    ///
    /// Fails when a vertex is not covered by the model, since the SNR
    /// of a source outside the model cannot be defined.
    pub fn restrict(&self, locations: &[Location]) -> NeurosimResult<Vec<f64>> {
        let n_total = self.n_columns();
        let n_cols = locations.len();
        let mut columns = Vec::with_capacity(n_cols);
        for loc in locations {
            let col = self.column_of(*loc).ok_or_else(|| {
                NeurosimError::ForwardMismatch(format!(
                    "vertex {} of source space {} is not covered, so the SNR cannot be adjusted",
                    loc.vertno, loc.src_idx
                ))
            })?;
            columns.push(col);
        }

        let mut restricted = vec![0.0; self.n_sensors * n_cols];
        for s in 0..self.n_sensors {
            let row = &self.gain[s * n_total..(s + 1) * n_total];
            let out = &mut restricted[s * n_cols..(s + 1) * n_cols];
            for (j, &col) in columns.iter().enumerate() {
                out[j] = row[col];
            }
        }
        Ok(restricted)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
