use std::path::Path;

/// Image formats eligible for perceptual fingerprinting.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// Video container formats whose frame fingerprints are supplied by the host.
pub const VIDEO_EXTENSIONS: [&str; 5] = ["mov", "mp4", "webm", "avi", "m4v"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

/// Classify a file by its extension, case-insensitively.
pub fn classify(path: &str) -> MediaKind {
    match extension_of(path) {
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => MediaKind::Image,
        Some(ext) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => MediaKind::Video,
        _ => MediaKind::Other,
    }
}

pub fn is_image_file(path: &str) -> bool {
    classify(path) == MediaKind::Image
}

pub fn is_video_file(path: &str) -> bool {
    classify(path) == MediaKind::Video
}

fn extension_of(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}
