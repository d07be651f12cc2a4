use crate::core::media::{self, MediaKind};
use crate::core::merkle::{self, MerkleNode};
use crate::core::perceptual;
use crate::progress::{self, ProgressCallback};

/// One input file as supplied by the host.
///
/// The byte buffer is consumed during record construction and not retained.
/// `video_frame_hashes` carries per-frame perceptual fingerprints for video
/// files when the host extracted them; it is empty otherwise.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub path: String,
    pub name: String,
    pub size: u64,
    pub data: Vec<u8>,
    /// Modification time as Unix epoch seconds.
    pub mod_time: i64,
    pub video_frame_hashes: Vec<u64>,
}

/// Immutable per-file analysis record: content fingerprints plus media
/// classification. Built once per input, then only borrowed by the
/// detection stages.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: String,
    pub root: Vec<u8>,
    pub tree: MerkleNode,
    pub size: u64,
    pub chunk_count: usize,
    /// Hex-encoded chunk digests in byte order.
    pub leaves: Vec<String>,
    pub mod_time: i64,
    /// Present only for images that decoded successfully.
    pub phash: Option<u64>,
    pub is_image: bool,
    /// Non-empty only for videos whose host supplied frame fingerprints.
    pub video_hashes: Vec<u64>,
    pub is_video: bool,
}

impl FileRecord {
    pub fn root_hex(&self) -> String {
        merkle::to_hex(&self.root)
    }
}

/// Chunk, hash, and fingerprint a single input file.
///
/// Emits one `Processing <name>` progress event before the work starts.
/// Image decode failures are absorbed: the record simply carries no
/// perceptual hash and content hashing proceeds.
pub fn process_file(
    file: RawFile,
    chunk_size: usize,
    index: usize,
    total: usize,
    callback: Option<&ProgressCallback>,
) -> FileRecord {
    progress::report(
        callback,
        index,
        total,
        format!("Processing {}", file.name),
        index as f64 / total as f64 * 100.0,
    );

    let hashes = merkle::chunk_hashes(&file.data, chunk_size);
    let chunk_count = hashes.len();
    let leaves: Vec<String> = hashes.iter().map(|h| merkle::to_hex(h)).collect();
    let tree = merkle::build_merkle_tree(hashes);
    let root = tree.hash.clone();

    let kind = media::classify(&file.path);
    let is_image = kind == MediaKind::Image;
    let is_video = kind == MediaKind::Video;

    let phash = if is_image {
        match perceptual::compute_phash(&file.data) {
            Ok(hash) => Some(hash),
            Err(err) => {
                tracing::debug!(path = %file.path, error = %err, "image decode failed, skipping fingerprint");
                None
            }
        }
    } else {
        None
    };

    let video_hashes = if is_video { file.video_frame_hashes } else { Vec::new() };

    FileRecord {
        path: file.path,
        root,
        tree,
        size: file.size,
        chunk_count,
        leaves,
        mod_time: file.mod_time,
        phash,
        is_image,
        video_hashes,
        is_video,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(path: &str, data: Vec<u8>) -> RawFile {
        RawFile {
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            size: data.len() as u64,
            data,
            mod_time: 1_700_000_000,
            video_frame_hashes: Vec::new(),
        }
    }

    #[test]
    fn test_leaf_count_is_ceiling_of_size_over_chunk() {
        let record = process_file(raw("a.bin", vec![1u8; 5000]), 1024, 0, 1, None);
        assert_eq!(record.chunk_count, 5);
        assert_eq!(record.leaves.len(), 5);
        assert_eq!(record.size, 5000);
    }

    #[test]
    fn test_empty_file_has_identity_root_and_no_leaves() {
        let record = process_file(raw("empty.bin", Vec::new()), 1024, 0, 1, None);
        assert_eq!(record.chunk_count, 0);
        assert!(record.leaves.is_empty());
        assert_eq!(record.root_hex(), "");
    }

    #[test]
    fn test_leaves_match_collected_tree_leaves() {
        let record = process_file(raw("a.bin", vec![9u8; 3000]), 1000, 0, 1, None);
        let collected: Vec<String> = merkle::collect_leaves(&record.tree)
            .iter()
            .map(|h| merkle::to_hex(h))
            .collect();
        assert_eq!(record.leaves, collected);
    }

    #[test]
    fn test_undecodable_image_is_flagged_without_fingerprint() {
        let record = process_file(raw("broken.jpg", b"not a jpeg".to_vec()), 1024, 0, 1, None);
        assert!(record.is_image);
        assert!(record.phash.is_none());
        // content hashing still ran
        assert_eq!(record.chunk_count, 1);
    }

    #[test]
    fn test_video_keeps_host_frame_hashes() {
        let mut file = raw("clip.mp4", vec![0u8; 10]);
        file.video_frame_hashes = vec![1, 2, 3];
        let record = process_file(file, 4, 0, 1, None);
        assert!(record.is_video);
        assert!(!record.is_image);
        assert_eq!(record.video_hashes, vec![1, 2, 3]);
    }

    #[test]
    fn test_non_video_drops_frame_hashes() {
        let mut file = raw("doc.txt", vec![0u8; 10]);
        file.video_frame_hashes = vec![1, 2, 3];
        let record = process_file(file, 4, 0, 1, None);
        assert!(!record.is_video);
        assert!(record.video_hashes.is_empty());
    }
}
