//! Duplicate and near-duplicate file detection.
//!
//! `dupescan` analyzes a batch of in-memory files and reports which of them
//! are byte-identical (same Merkle root over fixed-size chunks), byte-similar
//! (sharing a high fraction of content chunks), or visually similar (images
//! and videos with close perceptual fingerprints). Matches are combined into
//! duplicate groups with reclaimable-space estimates.
//!
//! The library is host-agnostic: callers supply [`RawFile`] values and an
//! optional progress callback, and receive a [`DedupResult`] whose JSON
//! shape is a stable contract. The bundled `dupescan` binary is the
//! reference host for local directories.

pub mod core;
pub mod engine;
pub mod model;
pub mod progress;

pub use engine::analyzer::{AnalyzeError, DedupEngine};
pub use engine::record::{FileRecord, RawFile};
pub use model::{
    DedupResult, DuplicateGroup, DuplicateMatch, FileNode, GroupKind, MatchKind,
};
pub use progress::{AnalysisProgress, ProgressCallback};

/// Analyze one batch of files in a single call.
///
/// Equivalent to building a [`DedupEngine`] with the given threshold and
/// chunk size and running [`DedupEngine::analyze`].
pub fn analyze(
    files: Vec<RawFile>,
    threshold: f64,
    chunk_size: usize,
    progress: Option<&ProgressCallback>,
) -> Result<DedupResult, AnalyzeError> {
    DedupEngine::new(threshold, chunk_size)?.analyze(files, progress)
}
