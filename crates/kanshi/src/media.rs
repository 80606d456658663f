//! Media file helpers: path validation and container checks

use std::path::{Component, Path, PathBuf};

/// A plain file name with no directory parts
pub fn is_bare_filename(name: &str) -> bool {
    !name.is_empty() && !name.contains("..") && !name.contains('/') && !name.contains('\\')
}

/// Resolve `rel` below `root`, refusing anything that could escape it
pub fn resolve_under(root: &Path, rel: &str) -> Option<PathBuf> {
    if rel.is_empty() || rel.contains('\\') {
        return None;
    }
    let rel = Path::new(rel);
    let normal = rel
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    normal.then(|| root.join(rel))
}

/// Lowercased extension including the dot, e.g. `.mp4`
fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
}

/// Content types `mime_guess` gets wrong for browser playback: it maps `.ts`
/// to a DLNA type instead of MPEG-TS
pub fn content_type_override(path: &Path) -> Option<&'static str> {
    matches!(extension(path).as_deref(), Some(".ts")).then_some("video/mp2t")
}

/// Containers the recording stream route can pass through without transcoding
pub fn is_streamable(path: &Path) -> bool {
    matches!(extension(path).as_deref(), Some(".mp4") | Some(".ts"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames() {
        assert!(is_bare_filename("evt_1.jpg"));
        assert!(!is_bare_filename("../secret"));
        assert!(!is_bare_filename("a/b.jpg"));
        assert!(!is_bare_filename("a\\b.jpg"));
        assert!(!is_bare_filename(""));
    }

    #[test]
    fn relative_paths_stay_under_root() {
        let root = Path::new("/data/rec");
        assert_eq!(
            resolve_under(root, "cam1/2024-05/2024-05-01/08-00-00.mp4"),
            Some(PathBuf::from("/data/rec/cam1/2024-05/2024-05-01/08-00-00.mp4"))
        );
        assert_eq!(resolve_under(root, "../etc/passwd"), None);
        assert_eq!(resolve_under(root, "/etc/passwd"), None);
        assert_eq!(resolve_under(root, "./x.mp4"), None);
        assert_eq!(resolve_under(root, ""), None);
    }

    #[test]
    fn container_checks() {
        assert_eq!(content_type_override(Path::new("a.TS")), Some("video/mp2t"));
        assert_eq!(content_type_override(Path::new("a.mp4")), None);
        assert!(is_streamable(Path::new("x.MP4")));
        assert!(is_streamable(Path::new("x.ts")));
        assert!(!is_streamable(Path::new("x.mkv")));
        assert!(!is_streamable(Path::new("x")));
    }
}
