use serde::Serialize;
use std::cmp::Ordering;
use std::iter::Peekable;
use std::path::{Path, PathBuf};
use std::str::Chars;
use walkdir::WalkDir;

use crate::error::{DedupError, Result};

/// Extensions picked up when the caller does not ask for anything else.
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// One extracted frame: its backing file and where it sits in capture order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Frame {
    pub path: PathBuf,
    pub position: usize,
}

impl Frame {
    pub fn new(path: impl Into<PathBuf>, position: usize) -> Self {
        Self {
            path: path.into(),
            position,
        }
    }

    /// File name for reports, falling back to the full path.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Wrap an already ordered list of paths; positions follow the caller's order.
pub fn frames_from_paths<I, P>(paths: I) -> Vec<Frame>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    paths
        .into_iter()
        .enumerate()
        .map(|(position, path)| Frame::new(path, position))
        .collect()
}

/// List the frames directly inside `dir`, in natural filename order.
///
/// Only files (or symlinks to files) whose lower-cased extension is in `extensions` are
/// returned. Subdirectories are not descended into.
pub fn list_frames(dir: &Path, extensions: &[String]) -> Result<Vec<Frame>> {
    if !dir.is_dir() {
        return Err(DedupError::InvalidDirectory {
            path: dir.to_path_buf(),
        });
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        // follows symlinks, so linked frames count as files
        if !entry.path().is_file() {
            continue;
        }
        if has_extension(entry.path(), extensions) {
            paths.push(entry.into_path());
        }
    }

    paths.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));
    log::debug!("found {} frame(s) in {}", paths.len(), dir.display());
    Ok(frames_from_paths(paths))
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Compare two names so that digit runs sort by numeric value.
///
/// `frame_2.jpg` sorts before `frame_10.jpg`. Names that only differ in
/// leading zeros fall back to plain lexical order so the result is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_run = take_digits(&mut left);
                let r_run = take_digits(&mut right);
                let ord = cmp_digit_runs(&l_run, &r_run);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                if l != r {
                    return l.cmp(&r);
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        run.push(c);
    }
    run
}

// Digit runs can be longer than any integer type, so compare them as text.
fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn default_exts() -> Vec<String> {
        DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_natural_order_numbers() {
        let mut names = vec!["frame_10.jpg", "frame_2.jpg", "frame_1.jpg", "frame_100.jpg"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(
            names,
            vec!["frame_1.jpg", "frame_2.jpg", "frame_10.jpg", "frame_100.jpg"]
        );
    }

    #[test]
    fn test_natural_order_zero_padded_matches_lexical() {
        let mut names = vec!["frame_000010.jpg", "frame_000002.jpg", "frame_000001.jpg"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(
            names,
            vec!["frame_000001.jpg", "frame_000002.jpg", "frame_000010.jpg"]
        );
    }

    #[test]
    fn test_natural_order_is_total_for_leading_zeros() {
        assert_eq!(natural_cmp("a01", "a1"), Ordering::Less);
        assert_eq!(natural_cmp("a1", "a01"), Ordering::Greater);
        assert_eq!(natural_cmp("a1", "a1"), Ordering::Equal);
    }

    #[test]
    fn test_list_frames_filters_and_orders() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["f_10.jpg", "f_2.JPG", "f_1.jpeg", "notes.txt", ".history.jsonl"] {
            fs::write(temp_dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(temp_dir.path().join("sub.jpg")).unwrap();

        let frames = list_frames(temp_dir.path(), &default_exts()).unwrap();
        let names: Vec<String> = frames.iter().map(Frame::name).collect();
        assert_eq!(names, vec!["f_1.jpeg", "f_2.JPG", "f_10.jpg"]);
        assert_eq!(
            frames.iter().map(|f| f.position).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_list_frames_follows_symlinks() {
        let temp_dir = TempDir::new().unwrap();
        let store = TempDir::new().unwrap();
        let target = store.path().join("shot.jpg");
        fs::write(&target, b"x").unwrap();
        fs::write(temp_dir.path().join("f_1.jpg"), b"x").unwrap();
        std::os::unix::fs::symlink(&target, temp_dir.path().join("f_2.jpg")).unwrap();
        std::os::unix::fs::symlink(store.path(), temp_dir.path().join("f_3.jpg")).unwrap();

        let frames = list_frames(temp_dir.path(), &default_exts()).unwrap();
        let names: Vec<String> = frames.iter().map(Frame::name).collect();
        assert_eq!(names, vec!["f_1.jpg", "f_2.jpg"]);
    }

    #[test]
    fn test_list_frames_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        let err = list_frames(&missing, &default_exts()).unwrap_err();
        assert!(matches!(err, DedupError::InvalidDirectory { .. }));
    }

    #[test]
    fn test_list_frames_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let frames = list_frames(temp_dir.path(), &default_exts()).unwrap();
        assert!(frames.is_empty());
    }

    #[test]
    fn test_frames_from_paths_keeps_caller_order() {
        let frames = frames_from_paths(["b.jpg", "a.jpg"]);
        assert_eq!(frames[0], Frame::new("b.jpg", 0));
        assert_eq!(frames[1], Frame::new("a.jpg", 1));
    }
}
