use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use thiserror::Error;

use crate::engine::exact::find_exact_duplicates;
use crate::engine::groups::{merge_matches, synthesize_groups};
use crate::engine::index::{find_partial_duplicates, ChunkIndex};
use crate::engine::record::{process_file, RawFile};
use crate::engine::tree::build_file_tree;
use crate::engine::visual::find_visual_duplicates;
use crate::model::DedupResult;
use crate::progress::{self, ProgressCallback};

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("similarity threshold must be within [0, 1], got {value}")]
    InvalidThreshold { value: f64 },

    #[error("chunk size must be a positive number of bytes")]
    InvalidChunkSize,

    #[error("file {path}: declared size {declared} does not match buffer length {actual}")]
    SizeMismatch {
        path: String,
        declared: u64,
        actual: usize,
    },

    #[error("duplicate input path: {path}")]
    DuplicatePath { path: String },

    #[error("internal invariant violated in {stage} stage: {detail}")]
    Invariant {
        stage: &'static str,
        detail: String,
    },
}

/// Duplicate-detection engine for one batch of in-memory files.
///
/// The pipeline runs hashing, chunk indexing, exact/partial/visual matching,
/// group synthesis, and tree assembly in a fixed linear order; a batch
/// reaches the final result exactly once, or fails with the offending stage.
pub struct DedupEngine {
    threshold: f64,
    chunk_size: usize,
}

impl DedupEngine {
    pub fn new(threshold: f64, chunk_size: usize) -> Result<Self, AnalyzeError> {
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(AnalyzeError::InvalidThreshold { value: threshold });
        }
        if chunk_size == 0 {
            return Err(AnalyzeError::InvalidChunkSize);
        }
        Ok(DedupEngine {
            threshold,
            chunk_size,
        })
    }

    /// Analyze a batch of files and return the combined duplicate report.
    ///
    /// The optional progress callback receives per-file events during
    /// hashing and coarse markers at each later stage boundary; leaving it
    /// out never changes the computed result.
    pub fn analyze(
        &self,
        files: Vec<RawFile>,
        callback: Option<&ProgressCallback>,
    ) -> Result<DedupResult, AnalyzeError> {
        let started = Instant::now();
        validate_batch(&files)?;

        let total = files.len();
        let records: Vec<_> = files
            .into_iter()
            .enumerate()
            .map(|(i, file)| process_file(file, self.chunk_size, i, total, callback))
            .collect();

        progress::report(callback, 30, 100, "Building chunk index...", 30.0);
        let index = ChunkIndex::build(&records);
        tracing::debug!(files = records.len(), chunks = index.len(), "chunk index built");

        progress::report(callback, 50, 100, "Finding exact duplicates...", 50.0);
        let exact = find_exact_duplicates(&records);

        progress::report(callback, 70, 100, "Finding similar files...", 70.0);
        let partial = find_partial_duplicates(&records, &index, &exact.member_paths, self.threshold)?;

        progress::report(callback, 80, 100, "Finding visually similar media...", 80.0);
        let visual = find_visual_duplicates(&records, &exact.member_paths);

        progress::report(callback, 85, 100, "Creating smart groups...", 85.0);
        let duplicate_groups = synthesize_groups(&records, &exact, &partial, &visual);

        progress::report(callback, 90, 100, "Building file tree...", 90.0);
        let all_matches = merge_matches(&exact, &partial, &visual);

        let root_path = records
            .first()
            .map(|r| parent_dir(&r.path))
            .unwrap_or_else(|| "/".to_string());
        let root_tree = build_file_tree(&root_path, &records, &all_matches);

        let total_files = records.len();
        let duplicate_files = exact.full_dup_count + partial.partial_dup_count;
        let result = DedupResult {
            root_tree,
            all_matches,
            duplicate_groups,
            total_files,
            unique_files: total_files - duplicate_files,
            full_dup_count: exact.full_dup_count,
            partial_dup_count: partial.partial_dup_count,
            visual_dup_count: visual.visual_dup_count,
            space_saved: exact.space_saved,
            processing_time: started.elapsed().as_secs_f64(),
        };

        progress::report(callback, 100, 100, "Analysis complete!", 100.0);
        tracing::debug!(
            total = result.total_files,
            exact = result.full_dup_count,
            partial = result.partial_dup_count,
            visual = result.visual_dup_count,
            "analysis complete"
        );
        Ok(result)
    }
}

fn validate_batch(files: &[RawFile]) -> Result<(), AnalyzeError> {
    let mut seen_paths: HashSet<&str> = HashSet::with_capacity(files.len());
    for file in files {
        if file.size != file.data.len() as u64 {
            return Err(AnalyzeError::SizeMismatch {
                path: file.path.clone(),
                declared: file.size,
                actual: file.data.len(),
            });
        }
        if !seen_paths.insert(&file.path) {
            return Err(AnalyzeError::DuplicatePath {
                path: file.path.clone(),
            });
        }
    }
    Ok(())
}

fn parent_dir(path: &str) -> String {
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            parent.to_string_lossy().to_string()
        }
        Some(_) => ".".to_string(),
        None => "/".to_string(),
    }
}
