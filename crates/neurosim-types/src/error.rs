// ─────────────────────────────────────────────────────────────────────
// NeuroSim — Source Engine Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all NeuroSim failures.
#[derive(Error, Debug)]
pub enum NeurosimError {
    /// Invalid input (simulation parameters, source declaration, config).
    #[error("config error: {0}")]
    Config(String),

    /// A coupling edge references a source that was never declared.
    #[error("unknown source '{0}' referenced in a coupling edge")]
    UnknownSource(String),

    /// A coupling edge connects a source to itself.
    #[error("source '{0}' cannot be coupled with itself")]
    SelfLoop(String),

    /// The same pair of sources was coupled twice (in either direction).
    #[error("coupling between '{source}' and '{target}' is already defined")]
    DuplicateEdge { r#source: String, target: String },

    /// Neither the edge nor the shared parameters name a coupling method.
    #[error("no coupling method specified for the edge ('{source}', '{target}')")]
    MissingMethod { r#source: String, target: String },

    /// A required kernel parameter is absent from the merged record.
    #[error("coupling method '{method}' requires parameter '{param}' for the edge ('{source}', '{target}')")]
    MissingParameter {
        method: &'static str,
        param: &'static str,
        r#source: String,
        target: String,
    },

    /// A kernel parameter is outside its admissible range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The coupling graph is not a forest.
    #[error("the coupling graph contains cycles, which are not supported")]
    CycleDetected,

    /// A kernel call failed while traversing the coupling graph.
    #[error("coupling failed on the edge ('{source}', '{target}'): {reason}")]
    CouplingExecution {
        r#source: String,
        target: String,
        reason: String,
    },

    /// SNR adjustment was requested but no noise sources exist.
    #[error("no noise sources were added, so the SNR cannot be adjusted")]
    NoNoiseSources,

    /// Sensor-space noise variance is zero; the initial SNR is undefined.
    #[error("noise variance in sensor space is zero, so the initial SNR cannot be estimated")]
    ZeroNoiseVariance,

    /// The SNR adjustment factor would be infinite.
    #[error("signal variance in sensor space is zero, so the SNR adjustment factor would be infinite")]
    ZeroSignalVariance,

    /// The forward model does not cover the simulated sources.
    #[error("forward model mismatch: {0}")]
    ForwardMismatch(String),

    /// Numerical error (NaN/Inf in computation).
    #[error("numerical error: {0}")]
    Numerical(String),
}

pub type NeurosimResult<T> = Result<T, NeurosimError>;
