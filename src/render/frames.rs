//! Frame-directory helpers shared by the watcher and the merge handoff.

use std::io;
use std::path::{Path, PathBuf};

/// Extension (lower-case) of a rendered frame.
pub const FRAME_EXTENSION: &str = "png";

/// Pattern the merger reads frames back with.
pub const FRAME_PATTERN: &str = "frame%06d.png";

fn is_frame(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(FRAME_EXTENSION))
        .unwrap_or(false)
}

/// Recursively list every frame image under `dir`, sorted by path.
///
/// A missing directory yields an empty list; the renderer may not have
/// created it yet.
pub fn list_frames(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let entries = match std::fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        for entry in entries {
            // Entries may vanish while the renderer rewrites its output.
            let (path, file_type) = match entry.and_then(|e| Ok((e.path(), e.file_type()?))) {
                Ok(found) => found,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() && is_frame(&path) {
                frames.push(path);
            }
        }
    }

    frames.sort();
    Ok(frames)
}

/// Number of frame images currently under `dir`.
pub fn count_frames(dir: &Path) -> io::Result<usize> {
    list_frames(dir).map(|f| f.len())
}

/// Remove `dir` if present and recreate it empty.
pub fn reset_dir(dir: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    std::fs::create_dir_all(dir)
}

/// Copy every frame under `src` into `dest` as a contiguous
/// `frame000000.png`, `frame000001.png`, … sequence in path order.
///
/// `dest` is cleared first.  Returns the number of frames copied.
pub fn collect_frames(src: &Path, dest: &Path) -> io::Result<usize> {
    let frames = list_frames(src)?;
    reset_dir(dest)?;

    for (index, frame) in frames.iter().enumerate() {
        std::fs::copy(frame, dest.join(format!("frame{index:06}.png")))?;
    }
    Ok(frames.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
