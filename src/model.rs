use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How two files were determined to be duplicates of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Byte-identical content (same Merkle root).
    Exact,
    /// High fraction of shared content chunks.
    Partial,
    /// Perceptually similar images or videos.
    Visual,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchKind::Exact => "exact",
            MatchKind::Partial => "partial",
            MatchKind::Visual => "visual",
        };
        f.write_str(name)
    }
}

/// Classification of a duplicate group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Exact,
    Similar,
    Visual,
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupKind::Exact => "exact",
            GroupKind::Similar => "similar",
            GroupKind::Visual => "visual",
        };
        f.write_str(name)
    }
}

/// A single directed duplicate relationship from a source file to a target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DuplicateMatch {
    pub target_path: String,
    /// Similarity in `[0, 1]`; exactly 1.0 only for exact matches.
    pub similarity: f64,
    /// Estimated number of bytes the source shares with the target.
    pub shared_size: u64,
    pub match_type: MatchKind,
}

/// A set of mutually related duplicate files with a savings estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DuplicateGroup {
    pub files: Vec<String>,
    pub similarity: f64,
    /// Combined size of all members in bytes.
    pub size: u64,
    pub group_type: GroupKind,
    /// Bytes reclaimable by keeping a single representative.
    pub savings: u64,
}

/// A node in the rendered directory tree: either a directory with children
/// or a file carrying its match list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileNode {
    pub path: String,
    pub name: String,
    pub is_dir: bool,
    pub children: Vec<FileNode>,
    pub matches: Vec<DuplicateMatch>,
    /// Highest similarity among this file's matches, 0.0 when none.
    pub best_match: f64,
    pub size: u64,
    pub relative_path: String,
}

impl FileNode {
    pub fn new_dir(path: String, name: String, relative_path: String) -> Self {
        FileNode {
            path,
            name,
            is_dir: true,
            children: Vec::new(),
            matches: Vec::new(),
            best_match: 0.0,
            size: 0,
            relative_path,
        }
    }
}

/// Complete result of one analysis batch.
///
/// The JSON field names of this struct (and of the nested match, group, and
/// tree types) are the stable wire contract consumed by hosts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DedupResult {
    pub root_tree: FileNode,
    pub all_matches: BTreeMap<String, Vec<DuplicateMatch>>,
    pub duplicate_groups: Vec<DuplicateGroup>,
    pub total_files: usize,
    pub unique_files: usize,
    pub full_dup_count: usize,
    pub partial_dup_count: usize,
    pub visual_dup_count: usize,
    pub space_saved: u64,
    /// Wall-clock processing time in seconds.
    pub processing_time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_kind_wire_names() {
        assert_eq!(serde_json::to_string(&MatchKind::Exact).unwrap(), "\"exact\"");
        assert_eq!(
            serde_json::to_string(&MatchKind::Partial).unwrap(),
            "\"partial\""
        );
        assert_eq!(
            serde_json::to_string(&MatchKind::Visual).unwrap(),
            "\"visual\""
        );
    }

    #[test]
    fn test_group_kind_wire_names() {
        assert_eq!(serde_json::to_string(&GroupKind::Exact).unwrap(), "\"exact\"");
        assert_eq!(
            serde_json::to_string(&GroupKind::Similar).unwrap(),
            "\"similar\""
        );
        assert_eq!(
            serde_json::to_string(&GroupKind::Visual).unwrap(),
            "\"visual\""
        );
    }

    #[test]
    fn test_duplicate_match_field_names() {
        let m = DuplicateMatch {
            target_path: "b.txt".to_string(),
            similarity: 1.0,
            shared_size: 42,
            match_type: MatchKind::Exact,
        };
        let json = serde_json::to_value(&m).unwrap();
        assert!(json.get("TargetPath").is_some());
        assert!(json.get("Similarity").is_some());
        assert!(json.get("SharedSize").is_some());
        assert!(json.get("MatchType").is_some());
    }
}
