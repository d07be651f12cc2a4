use serde::Serialize;

/// A single progress event emitted by the analysis pipeline.
///
/// `current`/`total` count units of the active stage (files during hashing,
/// percent points for coarse stage markers). `percent` is the overall
/// position in the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisProgress {
    pub current: usize,
    pub total: usize,
    pub message: String,
    pub percent: f64,
}

/// Host-supplied progress sink. Absence of a callback never changes results.
pub type ProgressCallback = Box<dyn Fn(AnalysisProgress) + Send + Sync>;

/// Deliver a progress event to the callback, if one was supplied.
pub(crate) fn report(
    callback: Option<&ProgressCallback>,
    current: usize,
    total: usize,
    message: impl Into<String>,
    percent: f64,
) {
    if let Some(callback) = callback {
        callback(AnalysisProgress {
            current,
            total,
            message: message.into(),
            percent,
        });
    }
}
