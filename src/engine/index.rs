use std::collections::{HashMap, HashSet};

use crate::engine::analyzer::AnalyzeError;
use crate::engine::record::FileRecord;
use crate::model::{DuplicateMatch, MatchKind};

/// Inverted index from hex chunk digest to the files containing that chunk.
///
/// Files are referenced by index into the record vector. Each (digest, file)
/// membership is recorded once even when a file repeats a chunk; callers may
/// only rely on "this file contains the chunk at least once".
#[derive(Debug, Default)]
pub struct ChunkIndex {
    map: HashMap<String, Vec<usize>>,
}

impl ChunkIndex {
    /// Build the index in one pass over all records.
    pub fn build(records: &[FileRecord]) -> Self {
        let mut map: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, record) in records.iter().enumerate() {
            let mut seen: HashSet<&str> = HashSet::with_capacity(record.leaves.len());
            for leaf in &record.leaves {
                if seen.insert(leaf) {
                    map.entry(leaf.clone()).or_default().push(i);
                }
            }
        }
        ChunkIndex { map }
    }

    pub fn lookup(&self, leaf: &str) -> Option<&[usize]> {
        self.map.get(leaf).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Output of the partial-duplicate stage.
#[derive(Debug, Default)]
pub struct PartialDuplicates {
    pub matches: HashMap<String, Vec<DuplicateMatch>>,
    pub partial_dup_count: usize,
}

/// Count, per candidate file, how many of the source's leaf occurrences the
/// candidate also contains, then keep candidates clearing the lower-bound
/// pre-filter `⌈threshold · leaf_count⌉`.
fn find_candidates(
    source: &FileRecord,
    index: &ChunkIndex,
    threshold: f64,
) -> HashMap<usize, usize> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for leaf in &source.leaves {
        if let Some(targets) = index.lookup(leaf) {
            for &target in targets {
                *counts.entry(target).or_insert(0) += 1;
            }
        }
    }

    // the 1e-9 slack keeps a ratio landing exactly on the threshold from
    // being rounded above the next integer (e.g. 0.9 * 10 -> 9.0000000000000002)
    let min_shared = (threshold * source.leaves.len() as f64 - 1e-9).ceil() as usize;
    counts.retain(|_, &mut count| count >= min_shared);
    counts
}

/// Shared-chunk similarity of `source` against `target`, normalized by the
/// source's leaf count (asymmetric by design).
fn compare_records(source: &FileRecord, target: &FileRecord) -> f64 {
    if source.root == target.root {
        return 1.0;
    }
    if source.leaves.is_empty() || target.leaves.is_empty() {
        return 0.0;
    }

    let target_set: HashSet<&str> = target.leaves.iter().map(String::as_str).collect();
    let shared = source
        .leaves
        .iter()
        .filter(|leaf| target_set.contains(leaf.as_str()))
        .count();

    shared as f64 / source.leaves.len() as f64
}

/// Find partially duplicated files via the chunk index.
///
/// Files already in an exact class are skipped as sources but stay in the
/// index, so they can still show up as targets of other files' searches.
/// Emitted similarities satisfy `threshold ≤ sim < 1.0`, at most one match
/// per distinct target.
pub fn find_partial_duplicates(
    records: &[FileRecord],
    index: &ChunkIndex,
    exact_members: &HashSet<String>,
    threshold: f64,
) -> Result<PartialDuplicates, AnalyzeError> {
    let mut result = PartialDuplicates::default();

    for (src_idx, source) in records.iter().enumerate() {
        if exact_members.contains(&source.path) {
            continue;
        }

        let candidates = find_candidates(source, index, threshold);
        let mut target_indices: Vec<usize> = candidates.into_keys().collect();
        target_indices.sort_unstable();

        let mut matches = Vec::new();
        for target_idx in target_indices {
            if target_idx == src_idx {
                continue;
            }
            let target = records.get(target_idx).ok_or_else(|| AnalyzeError::Invariant {
                stage: "partial",
                detail: format!(
                    "chunk index references file {} outside record vector of length {}",
                    target_idx,
                    records.len()
                ),
            })?;
            if source.root == target.root {
                continue;
            }

            let similarity = compare_records(source, target);
            if similarity >= threshold && similarity < 1.0 {
                matches.push(DuplicateMatch {
                    target_path: target.path.clone(),
                    similarity,
                    shared_size: (source.size as f64 * similarity) as u64,
                    match_type: MatchKind::Partial,
                });
            }
        }

        if !matches.is_empty() {
            result.matches.insert(source.path.clone(), matches);
            result.partial_dup_count += 1;
        }
    }

    Ok(result)
}
