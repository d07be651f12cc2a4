use std::collections::BTreeMap;
use std::path::{Path, MAIN_SEPARATOR};

use crate::engine::record::FileRecord;
use crate::model::{DuplicateMatch, FileNode};

/// Assemble the rooted directory tree handed back for rendering.
///
/// Construction is pure over record paths and the merged match map: each
/// file's node carries its match list and best similarity, directories are
/// created on demand. Records are visited in input order so the tree is
/// deterministic.
pub fn build_file_tree(
    root_path: &str,
    records: &[FileRecord],
    matches: &BTreeMap<String, Vec<DuplicateMatch>>,
) -> FileNode {
    let root_name = Path::new(root_path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| root_path.to_string());
    let mut root = FileNode::new_dir(root_path.to_string(), root_name, String::new());

    for record in records {
        let relative = Path::new(&record.path)
            .strip_prefix(root_path)
            .unwrap_or_else(|_| Path::new(&record.path));
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        if parts.is_empty() {
            continue;
        }
        insert_record(&mut root, &parts, record, matches, root_path);
    }

    root
}

fn insert_record(
    node: &mut FileNode,
    parts: &[String],
    record: &FileRecord,
    matches: &BTreeMap<String, Vec<DuplicateMatch>>,
    root_path: &str,
) {
    if parts.len() == 1 {
        let file_matches = matches.get(&record.path).cloned().unwrap_or_default();
        let best_match = file_matches
            .iter()
            .map(|m| m.similarity)
            .fold(0.0, f64::max);

        node.children.push(FileNode {
            path: record.path.clone(),
            name: parts[0].clone(),
            is_dir: false,
            children: Vec::new(),
            matches: file_matches,
            best_match,
            size: record.size,
            relative_path: relative_to(root_path, &record.path),
        });
        return;
    }

    let dir = find_or_create_dir(node, &parts[0], root_path);
    insert_record(dir, &parts[1..], record, matches, root_path);
}

fn find_or_create_dir<'a>(
    node: &'a mut FileNode,
    dir_name: &str,
    root_path: &str,
) -> &'a mut FileNode {
    let position = node
        .children
        .iter()
        .position(|child| child.is_dir && child.name == dir_name);

    match position {
        Some(i) => &mut node.children[i],
        None => {
            let path = join_path(&node.path, dir_name);
            let relative = relative_to(root_path, &path);
            node.children
                .push(FileNode::new_dir(path, dir_name.to_string(), relative));
            let last = node.children.len() - 1;
            &mut node.children[last]
        }
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() || base.ends_with(MAIN_SEPARATOR) {
        format!("{}{}", base, name)
    } else {
        format!("{}{}{}", base, MAIN_SEPARATOR, name)
    }
}

fn relative_to(root_path: &str, path: &str) -> String {
    Path::new(path)
        .strip_prefix(root_path)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| path.to_string())
}
