// ─────────────────────────────────────────────────────────────────────
// NeuroSim — Simulation Session
// ─────────────────────────────────────────────────────────────────────
//! User-facing simulation session. Sources are declared in groups,
//! coupling edges and SNR targets are attached to the declarations,
//! and `simulate` materializes everything into a reproducible
//! configuration: base waveforms, then coupling, then SNR calibration.
//!
//! Declarations are validated when they are made. A simulation run can
//! still fail on data-dependent conditions (degenerate variance, a
//! kernel rejecting its input), but never on a malformed declaration.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use neurosim_coupling::{synthesize, CouplingGraphBuilder, CouplingSpec};
use neurosim_types::{
    Band, Location, NeurosimError, NeurosimResult, SeedSequence, SimulationParams, Source,
    SourceSpaces,
};

use crate::estimate::SourceEstimate;
use crate::forward::ForwardModel;
use crate::generators::{OneOverFSource, WaveformSource};
use crate::location::LocationSampler;
use crate::snr::{adjust_snr_global, adjust_snr_local, LocalSnrTarget};

/// Where the sources of a group are placed.
#[derive(Clone)]
pub enum LocationSpec {
    /// Explicit vertices, identical in every simulation run.
    Fixed(Vec<Location>),
    /// Locations drawn by a sampler with a per-run child seed.
    Sampled(Arc<dyn LocationSampler>),
}

impl LocationSpec {
    fn n_sources(&self) -> usize {
        match self {
            LocationSpec::Fixed(locations) => locations.len(),
            LocationSpec::Sampled(sampler) => sampler.n_sources(),
        }
    }

    fn resolve(&self, spaces: &SourceSpaces, seed: u64) -> NeurosimResult<Vec<Location>> {
        match self {
            LocationSpec::Fixed(locations) => Ok(locations.clone()),
            LocationSpec::Sampled(sampler) => sampler.sample(spaces, seed),
        }
    }
}

/// How the activity of a group is produced.
#[derive(Clone)]
pub enum WaveformSpec {
    /// Explicit time courses, one row per source.
    Fixed(Vec<Vec<f64>>),
    /// Rows produced by a generator with a per-run child seed.
    Generated(Arc<dyn WaveformSource>),
}

impl WaveformSpec {
    fn resolve(
        &self,
        n_sources: usize,
        times: &[f64],
        seed: u64,
    ) -> NeurosimResult<Vec<Vec<f64>>> {
        match self {
            WaveformSpec::Fixed(rows) => {
                for row in rows {
                    if row.len() != times.len() {
                        return Err(NeurosimError::Config(format!(
                            "waveform rows carry {} samples, but the simulation grid has {}",
                            row.len(),
                            times.len()
                        )));
                    }
                }
                Ok(rows.clone())
            }
            WaveformSpec::Generated(source) => {
                let flat = source.generate(n_sources, times, seed)?;
                if flat.len() != n_sources * times.len() {
                    return Err(NeurosimError::Config(format!(
                        "the waveform generator returned {} samples, expected {} x {}",
                        flat.len(),
                        n_sources,
                        times.len()
                    )));
                }
                Ok(flat.chunks(times.len()).map(<[f64]>::to_vec).collect())
            }
        }
    }
}

/// Optional per-group settings for signal sources.
#[derive(Clone)]
pub struct SourceOptions {
    /// Target SNR values. A single value applies to every source of the
    /// group; otherwise one value per source is expected. None disables
    /// the adjustment.
    pub snr: Option<Vec<f64>>,
    /// Frequency band for measuring the SNR. Required when `snr` is set.
    pub band: Option<Band>,
    /// Standard-deviation scale applied when projecting. Default: 1.0.
    pub std: f64,
    /// Explicit source names. Autogenerated when absent.
    pub names: Option<Vec<String>>,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            snr: None,
            band: None,
            std: 1.0,
            names: None,
        }
    }
}

#[derive(Clone)]
enum GroupLocation {
    Points(LocationSpec),
    Patches(Vec<Vec<Location>>),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum GroupKind {
    Signal,
    Noise,
}

/// One `add_*_sources` declaration, kept until `simulate` materializes
/// it.
#[derive(Clone)]
struct SourceGroup {
    location: GroupLocation,
    waveform: WaveformSpec,
    snr: Option<Vec<f64>>,
    band: Option<Band>,
    std: f64,
    names: Vec<String>,
}

impl SourceGroup {
    fn materialize(
        &self,
        spaces: &SourceSpaces,
        times: &[f64],
        location_seed: u64,
        waveform_seed: u64,
    ) -> NeurosimResult<Vec<Source>> {
        let vertex_sets: Vec<Vec<Location>> = match &self.location {
            GroupLocation::Points(spec) => {
                let locations = spec.resolve(spaces, location_seed)?;
                if locations.len() != self.names.len() {
                    return Err(NeurosimError::Config(format!(
                        "the location sampler returned {} locations, expected {}",
                        locations.len(),
                        self.names.len()
                    )));
                }
                if let LocationSpec::Sampled(_) = spec {
                    let mut seen = BTreeSet::new();
                    for loc in &locations {
                        if !spaces.contains(*loc) {
                            return Err(NeurosimError::Config(format!(
                                "the location sampler returned vertex {} of source space {}, \
                                 which does not exist",
                                loc.vertno, loc.src_idx
                            )));
                        }
                        if !seen.insert(*loc) {
                            return Err(NeurosimError::Config(
                                "the location sampler returned duplicate vertices".to_string(),
                            ));
                        }
                    }
                }
                locations.into_iter().map(|loc| vec![loc]).collect()
            }
            GroupLocation::Patches(patches) => patches.clone(),
        };

        let rows = self.waveform.resolve(self.names.len(), times, waveform_seed)?;
        Ok(self
            .names
            .iter()
            .zip(vertex_sets)
            .zip(rows)
            .map(|((name, vertices), waveform)| {
                Source::new(name.clone(), vertices, waveform, self.std)
            })
            .collect())
    }
}

/// Declarative builder for simulated source configurations.
///
/// Usage follows the lifecycle of a study setup: declare signal and
/// noise sources, attach coupling edges between them, optionally
/// request SNR calibration, then call [`simulate`](Self::simulate) as
/// often as needed. Every run with the same seed reproduces the same
/// configuration.
#[derive(Clone)]
pub struct SourceSimulator {
    spaces: SourceSpaces,
    signal_groups: Vec<SourceGroup>,
    noise_groups: Vec<SourceGroup>,
    builder: CouplingGraphBuilder,
    global_snr: Option<(f64, Band)>,
    local_snr_declared: bool,
}

impl SourceSimulator {
    pub fn new(spaces: SourceSpaces) -> NeurosimResult<Self> {
        spaces.validate()?;
        Ok(Self {
            spaces,
            signal_groups: Vec::new(),
            noise_groups: Vec::new(),
            builder: CouplingGraphBuilder::new(),
            global_snr: None,
            local_snr_declared: false,
        })
    }

    /// Declare a group of point sources. Returns the source names,
    /// autogenerated as `auto-sgN-sM` unless provided.
    pub fn add_point_sources(
        &mut self,
        location: LocationSpec,
        waveform: WaveformSpec,
        opts: SourceOptions,
    ) -> NeurosimResult<Vec<String>> {
        self.add_group(GroupKind::Signal, GroupLocation::Points(location), waveform, opts)
    }

    /// Declare a group of patch sources from explicit vertex lists.
    /// Each patch spreads one waveform over all of its vertices.
    pub fn add_patch_sources(
        &mut self,
        patches: Vec<Vec<Location>>,
        waveform: WaveformSpec,
        opts: SourceOptions,
    ) -> NeurosimResult<Vec<String>> {
        self.add_group(GroupKind::Signal, GroupLocation::Patches(patches), waveform, opts)
    }

    /// Declare noise sources carrying 1/f activity. Returns the
    /// autogenerated `auto-ngN-sM` names.
    pub fn add_noise_sources(&mut self, location: LocationSpec) -> NeurosimResult<Vec<String>> {
        self.add_noise_sources_with(
            location,
            WaveformSpec::Generated(Arc::new(OneOverFSource::default())),
        )
    }

    /// Declare noise sources with a custom waveform.
    pub fn add_noise_sources_with(
        &mut self,
        location: LocationSpec,
        waveform: WaveformSpec,
    ) -> NeurosimResult<Vec<String>> {
        self.add_group(
            GroupKind::Noise,
            GroupLocation::Points(location),
            waveform,
            SourceOptions::default(),
        )
    }

    /// Declare coupling edges between named sources.
    ///
    /// `common` supplies shared parameters; edge-specific values win on
    /// conflict. The whole call is validated first and applied only
    /// when every edge is accepted.
    pub fn set_coupling(
        &mut self,
        edges: &[(&str, &str, CouplingSpec)],
        common: &CouplingSpec,
    ) -> NeurosimResult<()> {
        if edges.is_empty() {
            return Err(NeurosimError::Config(
                "at least one coupling edge must be provided".to_string(),
            ));
        }
        let mut trial = self.builder.clone();
        trial.set_common(common.clone());
        for (source, target, spec) in edges {
            trial.add_edge(source, target, spec)?;
        }
        self.builder = trial;
        Ok(())
    }

    /// Request one SNR target for the combined signal power. Repeated
    /// calls replace the previous target.
    pub fn set_global_snr(&mut self, snr: f64, band: Band) -> NeurosimResult<()> {
        if self.local_snr_declared {
            return Err(NeurosimError::Config(
                "local and global SNR adjustment cannot be combined in one simulation"
                    .to_string(),
            ));
        }
        if !snr.is_finite() || snr < 0.0 {
            return Err(NeurosimError::Config(format!(
                "target SNR must be finite and non-negative, got {snr}"
            )));
        }
        band.validate()?;
        self.global_snr = Some((snr, band));
        Ok(())
    }

    /// Materialize a source configuration.
    ///
    /// The stages run in declaration-independent order: noise groups,
    /// then signal groups, then coupling, then SNR calibration. Each
    /// randomized step draws its own child seed from `seed`, so the
    /// whole run replays from this one value.
    pub fn simulate(
        &self,
        params: &SimulationParams,
        fwd: Option<&ForwardModel>,
        seed: u64,
    ) -> NeurosimResult<SourceConfiguration> {
        params.validate()?;
        if self.signal_groups.is_empty() && self.noise_groups.is_empty() {
            return Err(NeurosimError::Config(
                "no sources were added to the configuration".to_string(),
            ));
        }
        let snr_requested = self.local_snr_declared || self.global_snr.is_some();
        if snr_requested && fwd.is_none() {
            return Err(NeurosimError::Config(
                "a forward model is required for the adjustment of SNR".to_string(),
            ));
        }

        let times = params.times();
        let mut seeds = SeedSequence::new(seed);

        let mut all = BTreeMap::new();
        for group in self.noise_groups.iter().chain(self.signal_groups.iter()) {
            let location_seed = seeds.next_seed();
            let waveform_seed = seeds.next_seed();
            for source in group.materialize(&self.spaces, &times, location_seed, waveform_seed)? {
                all.insert(source.name.clone(), source);
            }
        }

        let graph = self.builder.build();
        synthesize(&mut all, &graph, params.sfreq, &mut seeds)?;

        let noise_names: BTreeSet<&String> = self
            .noise_groups
            .iter()
            .flat_map(|g| g.names.iter())
            .collect();
        let mut sources = BTreeMap::new();
        let mut noise_sources = BTreeMap::new();
        for (name, source) in all {
            if noise_names.contains(&name) {
                noise_sources.insert(name, source);
            } else {
                sources.insert(name, source);
            }
        }

        if let Some(fwd) = fwd {
            if let Some((snr, band)) = self.global_snr {
                adjust_snr_global(
                    &mut sources,
                    snr,
                    band,
                    &noise_sources,
                    &self.spaces,
                    fwd,
                    params.sfreq,
                )?;
            } else if self.local_snr_declared {
                let targets = self.local_targets();
                adjust_snr_local(
                    &mut sources,
                    &targets,
                    &noise_sources,
                    &self.spaces,
                    fwd,
                    params.sfreq,
                )?;
            }
        }

        Ok(SourceConfiguration {
            spaces: self.spaces.clone(),
            params: params.clone(),
            sources,
            noise_sources,
            seed,
        })
    }

    fn local_targets(&self) -> Vec<LocalSnrTarget> {
        let mut targets = Vec::new();
        for group in &self.signal_groups {
            let (Some(snr), Some(band)) = (&group.snr, group.band) else {
                continue;
            };
            for (name, &value) in group.names.iter().zip(snr.iter()) {
                targets.push(LocalSnrTarget {
                    name: name.clone(),
                    snr: value,
                    band,
                });
            }
        }
        targets
    }

    fn add_group(
        &mut self,
        kind: GroupKind,
        location: GroupLocation,
        waveform: WaveformSpec,
        opts: SourceOptions,
    ) -> NeurosimResult<Vec<String>> {
        let n = match &location {
            GroupLocation::Points(spec) => spec.n_sources(),
            GroupLocation::Patches(patches) => patches.len(),
        };
        if n == 0 {
            return Err(NeurosimError::Config(
                "a source group must contain at least one source".to_string(),
            ));
        }

        match &location {
            GroupLocation::Points(LocationSpec::Fixed(locations)) => {
                for loc in locations {
                    if !self.spaces.contains(*loc) {
                        return Err(NeurosimError::Config(format!(
                            "vertex {} of source space {} does not exist",
                            loc.vertno, loc.src_idx
                        )));
                    }
                }
            }
            GroupLocation::Patches(patches) => {
                for (idx, patch) in patches.iter().enumerate() {
                    if patch.is_empty() {
                        return Err(NeurosimError::Config(format!(
                            "patch {idx} occupies no vertices"
                        )));
                    }
                    let mut seen = BTreeSet::new();
                    for loc in patch {
                        if !self.spaces.contains(*loc) {
                            return Err(NeurosimError::Config(format!(
                                "vertex {} of source space {} does not exist",
                                loc.vertno, loc.src_idx
                            )));
                        }
                        if !seen.insert(*loc) {
                            return Err(NeurosimError::Config(format!(
                                "patch {idx} lists vertex {} of source space {} twice",
                                loc.vertno, loc.src_idx
                            )));
                        }
                    }
                }
            }
            GroupLocation::Points(LocationSpec::Sampled(_)) => {}
        }

        if let WaveformSpec::Fixed(rows) = &waveform {
            if rows.len() != n {
                return Err(NeurosimError::Config(format!(
                    "the waveform array has {} rows, but the group declares {n} sources",
                    rows.len()
                )));
            }
            if let Some(first) = rows.first() {
                if first.is_empty() {
                    return Err(NeurosimError::Config(
                        "waveform rows must not be empty".to_string(),
                    ));
                }
                if rows.iter().any(|row| row.len() != first.len()) {
                    return Err(NeurosimError::Config(
                        "waveform rows must all have the same number of samples".to_string(),
                    ));
                }
            }
        }

        if !opts.std.is_finite() || opts.std <= 0.0 {
            return Err(NeurosimError::Config(format!(
                "std must be a positive finite number, got {}",
                opts.std
            )));
        }

        let snr = match opts.snr {
            None => None,
            Some(values) => {
                if kind == GroupKind::Noise {
                    return Err(NeurosimError::Config(
                        "noise sources do not support the adjustment of SNR".to_string(),
                    ));
                }
                if self.global_snr.is_some() {
                    return Err(NeurosimError::Config(
                        "local and global SNR adjustment cannot be combined in one simulation"
                            .to_string(),
                    ));
                }
                let values = if values.len() == 1 {
                    vec![values[0]; n]
                } else {
                    values
                };
                if values.len() != n {
                    return Err(NeurosimError::Config(format!(
                        "expected 1 or {n} SNR values, got {}",
                        values.len()
                    )));
                }
                for &value in &values {
                    if !value.is_finite() || value < 0.0 {
                        return Err(NeurosimError::Config(format!(
                            "target SNR must be finite and non-negative, got {value}"
                        )));
                    }
                }
                Some(values)
            }
        };
        let band = match (snr.is_some(), opts.band) {
            (true, None) => {
                return Err(NeurosimError::Config(
                    "frequency band limits are required for the adjustment of SNR".to_string(),
                ));
            }
            (true, Some(band)) => {
                band.validate()?;
                Some(band)
            }
            (false, band) => band,
        };

        let tag = match kind {
            GroupKind::Signal => format!("sg{}", self.signal_groups.len()),
            GroupKind::Noise => format!("ng{}", self.noise_groups.len()),
        };
        let names = match opts.names {
            Some(names) => {
                if names.len() != n {
                    return Err(NeurosimError::Config(
                        "the number of provided source names does not match the number of sources"
                            .to_string(),
                    ));
                }
                for name in &names {
                    if name.is_empty() {
                        return Err(NeurosimError::Config(
                            "source names must not be empty".to_string(),
                        ));
                    }
                    if name.starts_with("auto-") {
                        return Err(NeurosimError::Config(format!(
                            "source name '{name}' uses the reserved 'auto-' prefix"
                        )));
                    }
                }
                names
            }
            None => (0..n).map(|idx| format!("auto-{tag}-s{idx}")).collect(),
        };

        // Register all names or none, so a rejected declaration leaves
        // no trace in the session.
        let mut trial = self.builder.clone();
        for name in &names {
            trial.declare_source(name)?;
        }
        self.builder = trial;

        if snr.is_some() {
            self.local_snr_declared = true;
        }
        let group = SourceGroup {
            location,
            waveform,
            snr,
            band,
            std: opts.std,
            names: names.clone(),
        };
        match kind {
            GroupKind::Signal => self.signal_groups.push(group),
            GroupKind::Noise => self.noise_groups.push(group),
        }
        Ok(names)
    }
}

/// One materialized simulation: the sources with their final waveforms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfiguration {
    pub spaces: SourceSpaces,
    pub params: SimulationParams,
    sources: BTreeMap<String, Source>,
    noise_sources: BTreeMap<String, Source>,
    pub seed: u64,
}

impl SourceConfiguration {
    pub fn sources(&self) -> &BTreeMap<String, Source> {
        &self.sources
    }

    pub fn noise_sources(&self) -> &BTreeMap<String, Source> {
        &self.noise_sources
    }

    /// Look up a signal or noise source by name.
    pub fn source(&self, name: &str) -> Option<&Source> {
        self.sources.get(name).or_else(|| self.noise_sources.get(name))
    }

    /// Combine all signal and noise sources into one estimate.
    pub fn combined_estimate(&self) -> NeurosimResult<SourceEstimate> {
        SourceEstimate::from_sources(
            self.sources.values().chain(self.noise_sources.values()),
            &self.spaces,
            self.params.sfreq,
        )
    }
}

// ── Tests ────────────────────────────────────────────────────────────
