use std::collections::{HashMap, HashSet};

use crate::core::perceptual::{
    frame_sequence_similarity, hash_similarity, VISUAL_SIMILARITY_THRESHOLD,
};
use crate::engine::record::FileRecord;
use crate::model::{DuplicateMatch, MatchKind};

/// Output of the visual-match stage.
#[derive(Debug, Default)]
pub struct VisualDuplicates {
    pub matches: HashMap<String, Vec<DuplicateMatch>>,
    pub visual_dup_count: usize,
}

/// All-pairs perceptual comparison over fingerprinted media.
///
/// Images compare by 64-bit hash, videos by frame sequence; the two sets are
/// never cross-compared. Files already in an exact class are left out, as
/// are images whose decode failed and videos without host-supplied frame
/// fingerprints. Matches above threshold are recorded symmetrically.
pub fn find_visual_duplicates(
    records: &[FileRecord],
    exact_members: &HashSet<String>,
) -> VisualDuplicates {
    let images: Vec<(&FileRecord, u64)> = records
        .iter()
        .filter(|r| !exact_members.contains(&r.path))
        .filter_map(|r| r.phash.map(|hash| (r, hash)))
        .collect();

    let videos: Vec<&FileRecord> = records
        .iter()
        .filter(|r| r.is_video && !r.video_hashes.is_empty() && !exact_members.contains(&r.path))
        .collect();

    let mut matches: HashMap<String, Vec<DuplicateMatch>> = HashMap::new();

    for (i, &(src, src_hash)) in images.iter().enumerate() {
        for &(tgt, tgt_hash) in images.iter().skip(i + 1) {
            let similarity = hash_similarity(src_hash, tgt_hash);
            if similarity >= VISUAL_SIMILARITY_THRESHOLD {
                record_pair(&mut matches, src, tgt, similarity);
            }
        }
    }

    for (i, &src) in videos.iter().enumerate() {
        for &tgt in videos.iter().skip(i + 1) {
            let similarity = frame_sequence_similarity(&src.video_hashes, &tgt.video_hashes);
            if similarity >= VISUAL_SIMILARITY_THRESHOLD {
                record_pair(&mut matches, src, tgt, similarity);
            }
        }
    }

    let visual_dup_count = matches.len();
    VisualDuplicates {
        matches,
        visual_dup_count,
    }
}

fn record_pair(
    matches: &mut HashMap<String, Vec<DuplicateMatch>>,
    src: &FileRecord,
    tgt: &FileRecord,
    similarity: f64,
) {
    matches
        .entry(src.path.clone())
        .or_default()
        .push(DuplicateMatch {
            target_path: tgt.path.clone(),
            similarity,
            shared_size: src.size,
            match_type: MatchKind::Visual,
        });
    matches
        .entry(tgt.path.clone())
        .or_default()
        .push(DuplicateMatch {
            target_path: src.path.clone(),
            similarity,
            shared_size: tgt.size,
            match_type: MatchKind::Visual,
        });
}
