use std::collections::{BTreeMap, HashMap, HashSet};

use crate::core::perceptual::VISUAL_SIMILARITY_THRESHOLD;
use crate::engine::exact::ExactDuplicates;
use crate::engine::index::PartialDuplicates;
use crate::engine::record::FileRecord;
use crate::engine::visual::VisualDuplicates;
use crate::model::{DuplicateGroup, DuplicateMatch, GroupKind};

/// Minimum similarity for folding a partial match into a "similar" group.
pub const SIMILAR_GROUP_THRESHOLD: f64 = 0.80;

/// Merge exact, partial, and visual evidence into one group list.
///
/// Exact groups pass through unchanged. The similar and visual passes are
/// greedy: sources are visited in input order, each unprocessed source seeds
/// a group extended with its above-threshold targets, and only the seed's
/// own edges govern membership (transitive similarity is not enforced).
pub fn synthesize_groups(
    records: &[FileRecord],
    exact: &ExactDuplicates,
    partial: &PartialDuplicates,
    visual: &VisualDuplicates,
) -> Vec<DuplicateGroup> {
    let sizes: HashMap<&str, u64> = records.iter().map(|r| (r.path.as_str(), r.size)).collect();

    let mut groups = exact.groups.clone();
    groups.extend(similar_groups(records, &partial.matches, &sizes));
    groups.extend(visual_groups(records, &visual.matches, &sizes));
    groups
}

fn similar_groups(
    records: &[FileRecord],
    matches: &HashMap<String, Vec<DuplicateMatch>>,
    sizes: &HashMap<&str, u64>,
) -> Vec<DuplicateGroup> {
    let mut groups = Vec::new();
    let mut processed: HashSet<String> = HashSet::new();

    for record in records {
        let Some(source_matches) = matches.get(&record.path) else {
            continue;
        };
        if processed.contains(&record.path) {
            continue;
        }

        let mut files = vec![record.path.clone()];
        for m in source_matches {
            if m.similarity >= SIMILAR_GROUP_THRESHOLD && !processed.contains(&m.target_path) {
                files.push(m.target_path.clone());
            }
        }

        if files.len() < 2 {
            continue;
        }
        for path in &files {
            processed.insert(path.clone());
        }

        let aggregate = aggregate_size(&files, sizes);
        groups.push(DuplicateGroup {
            files,
            similarity: SIMILAR_GROUP_THRESHOLD,
            size: aggregate,
            group_type: GroupKind::Similar,
            savings: aggregate / 2,
        });
    }

    groups
}

fn visual_groups(
    records: &[FileRecord],
    matches: &HashMap<String, Vec<DuplicateMatch>>,
    sizes: &HashMap<&str, u64>,
) -> Vec<DuplicateGroup> {
    let mut groups = Vec::new();
    let mut processed: HashSet<String> = HashSet::new();

    for record in records {
        let Some(source_matches) = matches.get(&record.path) else {
            continue;
        };
        if processed.contains(&record.path) {
            continue;
        }

        let mut files = vec![record.path.clone()];
        let mut similarity_sum = 0.0;
        for m in source_matches {
            if m.similarity >= VISUAL_SIMILARITY_THRESHOLD && !processed.contains(&m.target_path) {
                files.push(m.target_path.clone());
                similarity_sum += m.similarity;
            }
        }

        // a seed with no admissible edges forms no group
        if files.len() < 2 {
            continue;
        }
        for path in &files {
            processed.insert(path.clone());
        }

        let edge_count = files.len() - 1;
        let aggregate = aggregate_size(&files, sizes);
        let first_size = sizes.get(files[0].as_str()).copied().unwrap_or(0);
        groups.push(DuplicateGroup {
            similarity: similarity_sum / edge_count as f64,
            size: aggregate,
            group_type: GroupKind::Visual,
            savings: aggregate - first_size,
            files,
        });
    }

    groups
}

fn aggregate_size(files: &[String], sizes: &HashMap<&str, u64>) -> u64 {
    files
        .iter()
        .map(|path| sizes.get(path.as_str()).copied().unwrap_or(0))
        .sum()
}

/// Concatenating union of per-file match lists: shared keys append their
/// value lists, unique keys carry through.
pub fn merge_matches(
    exact: &ExactDuplicates,
    partial: &PartialDuplicates,
    visual: &VisualDuplicates,
) -> BTreeMap<String, Vec<DuplicateMatch>> {
    let mut merged: BTreeMap<String, Vec<DuplicateMatch>> = BTreeMap::new();
    for source in [&exact.matches, &partial.matches, &visual.matches] {
        for (path, matches) in source {
            merged
                .entry(path.clone())
                .or_default()
                .extend(matches.iter().cloned());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::merkle::MerkleNode;
    use crate::model::MatchKind;

    fn plain_record(path: &str, size: u64) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            root: path.as_bytes().to_vec(),
            tree: MerkleNode {
                hash: path.as_bytes().to_vec(),
                is_leaf: true,
                children: Vec::new(),
            },
            size,
            chunk_count: 1,
            leaves: vec![path.to_string()],
            mod_time: 0,
            phash: None,
            is_image: false,
            video_hashes: Vec::new(),
            is_video: false,
        }
    }

    fn matched(target: &str, similarity: f64, kind: MatchKind) -> DuplicateMatch {
        DuplicateMatch {
            target_path: target.to_string(),
            similarity,
            shared_size: 0,
            match_type: kind,
        }
    }

    #[test]
    fn test_similar_group_from_partial_matches() {
        let records = vec![
            plain_record("a", 1000),
            plain_record("b", 1000),
            plain_record("c", 500),
        ];
        let mut partial = PartialDuplicates::default();
        partial.matches.insert(
            "a".to_string(),
            vec![
                matched("b", 0.9, MatchKind::Partial),
                matched("c", 0.85, MatchKind::Partial),
            ],
        );

        let groups = synthesize_groups(
            &records,
            &ExactDuplicates::default(),
            &partial,
            &VisualDuplicates::default(),
        );

        assert_eq!(groups.len(), 1);
        let g = &groups[0];
        assert_eq!(g.group_type, GroupKind::Similar);
        assert_eq!(g.files, vec!["a", "b", "c"]);
        assert_eq!(g.similarity, SIMILAR_GROUP_THRESHOLD);
        assert_eq!(g.size, 2500);
        assert_eq!(g.savings, 1250);
    }

    #[test]
    fn test_similar_pass_skips_already_grouped_targets() {
        let records = vec![
            plain_record("a", 100),
            plain_record("b", 100),
            plain_record("c", 100),
        ];
        let mut partial = PartialDuplicates::default();
        partial
            .matches
            .insert("a".to_string(), vec![matched("b", 0.9, MatchKind::Partial)]);
        partial
            .matches
            .insert("b".to_string(), vec![matched("a", 0.9, MatchKind::Partial)]);
        partial
            .matches
            .insert("c".to_string(), vec![matched("b", 0.82, MatchKind::Partial)]);

        let groups = synthesize_groups(
            &records,
            &ExactDuplicates::default(),
            &partial,
            &VisualDuplicates::default(),
        );

        // a seeds {a, b}; b is consumed; c's only edge points at a processed
        // file, so no second group forms
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].files, vec!["a", "b"]);
    }

    #[test]
    fn test_low_similarity_partial_edges_do_not_group() {
        let records = vec![plain_record("a", 100), plain_record("b", 100)];
        let mut partial = PartialDuplicates::default();
        partial
            .matches
            .insert("a".to_string(), vec![matched("b", 0.7, MatchKind::Partial)]);

        let groups = synthesize_groups(
            &records,
            &ExactDuplicates::default(),
            &partial,
            &VisualDuplicates::default(),
        );
        assert!(groups.is_empty());
    }

    #[test]
    fn test_visual_group_similarity_is_mean_of_edges() {
        let records = vec![
            plain_record("a.jpg", 300),
            plain_record("b.jpg", 200),
            plain_record("c.jpg", 100),
        ];
        let mut visual = VisualDuplicates::default();
        visual.matches.insert(
            "a.jpg".to_string(),
            vec![
                matched("b.jpg", 0.90, MatchKind::Visual),
                matched("c.jpg", 0.86, MatchKind::Visual),
            ],
        );

        let groups = synthesize_groups(
            &records,
            &ExactDuplicates::default(),
            &PartialDuplicates::default(),
            &visual,
        );

        assert_eq!(groups.len(), 1);
        let g = &groups[0];
        assert_eq!(g.group_type, GroupKind::Visual);
        assert!((g.similarity - 0.88).abs() < 1e-12);
        assert_eq!(g.size, 600);
        // first member kept
        assert_eq!(g.savings, 300);
    }

    #[test]
    fn test_visual_seed_without_admissible_edges_emits_nothing() {
        let records = vec![plain_record("a.jpg", 100), plain_record("b.jpg", 100)];
        let mut visual = VisualDuplicates::default();
        visual.matches.insert(
            "a.jpg".to_string(),
            vec![matched("b.jpg", 0.5, MatchKind::Visual)],
        );

        let groups = synthesize_groups(
            &records,
            &ExactDuplicates::default(),
            &PartialDuplicates::default(),
            &visual,
        );
        assert!(groups.is_empty());
    }

    #[test]
    fn test_merge_matches_concatenates_shared_keys() {
        let mut exact = ExactDuplicates::default();
        exact
            .matches
            .insert("a".to_string(), vec![matched("b", 1.0, MatchKind::Exact)]);
        let mut visual = VisualDuplicates::default();
        visual
            .matches
            .insert("a".to_string(), vec![matched("c", 0.9, MatchKind::Visual)]);
        visual
            .matches
            .insert("d".to_string(), vec![matched("a", 0.9, MatchKind::Visual)]);

        let merged = merge_matches(&exact, &PartialDuplicates::default(), &visual);
        assert_eq!(merged["a"].len(), 2);
        assert_eq!(merged["d"].len(), 1);
    }
}
