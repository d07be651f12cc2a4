use std::collections::{HashMap, HashSet};

use crate::engine::record::FileRecord;
use crate::model::{DuplicateGroup, DuplicateMatch, GroupKind, MatchKind};

/// Output of the exact-duplicate stage.
///
/// `member_paths` holds every file belonging to some exact class; later
/// stages use it to skip those files as partial sources and visual
/// candidates.
#[derive(Debug, Default)]
pub struct ExactDuplicates {
    pub matches: HashMap<String, Vec<DuplicateMatch>>,
    pub groups: Vec<DuplicateGroup>,
    pub member_paths: HashSet<String>,
    pub full_dup_count: usize,
    pub space_saved: u64,
}

/// Partition records by Merkle root; classes of two or more files are exact
/// duplicates.
///
/// Groups enumerate members in input order, keyed by the order each root
/// was first encountered. Savings assume one representative (the first
/// member) is kept.
pub fn find_exact_duplicates(records: &[FileRecord]) -> ExactDuplicates {
    let mut class_order: Vec<String> = Vec::new();
    let mut classes: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        let root = record.root_hex();
        classes
            .entry(root.clone())
            .or_insert_with(|| {
                class_order.push(root);
                Vec::new()
            })
            .push(i);
    }

    let mut result = ExactDuplicates::default();

    for root in class_order {
        let members = &classes[&root];
        if members.len() < 2 {
            continue;
        }

        let files: Vec<String> = members.iter().map(|&i| records[i].path.clone()).collect();
        let aggregate: u64 = members.iter().map(|&i| records[i].size).sum();
        let savings = aggregate - records[members[0]].size;

        result.groups.push(DuplicateGroup {
            files: files.clone(),
            similarity: 1.0,
            size: aggregate,
            group_type: GroupKind::Exact,
            savings,
        });

        for &src in members {
            let source = &records[src];
            let matches: Vec<DuplicateMatch> = members
                .iter()
                .filter(|&&tgt| tgt != src)
                .map(|&tgt| DuplicateMatch {
                    target_path: records[tgt].path.clone(),
                    similarity: 1.0,
                    shared_size: source.size,
                    match_type: MatchKind::Exact,
                })
                .collect();

            if result.member_paths.insert(source.path.clone()) {
                result.full_dup_count += 1;
            }
            result.matches.insert(source.path.clone(), matches);
        }

        result.space_saved += savings;
    }

    result
}
