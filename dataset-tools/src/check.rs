use image::ImageReader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{DatasetError, Result};

#[derive(Debug, Clone)]
pub struct CorruptImage {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub scanned: usize,
    pub corrupted: Vec<CorruptImage>,
}

fn decode(path: &Path) -> std::result::Result<(), String> {
    ImageReader::open(path)
        .map_err(|e| e.to_string())?
        .with_guessed_format()
        .map_err(|e| e.to_string())?
        .decode()
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Tries to decode every file under `dir`. Files that do not decode,
/// including non-image files, are reported as corrupted.
pub fn check_images(dir: &Path) -> Result<CheckReport> {
    if !dir.is_dir() {
        return Err(DatasetError::NotADirectory(dir.to_path_buf()));
    }

    let mut report = CheckReport::default();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        report.scanned += 1;
        if let Err(reason) = decode(entry.path()) {
            log::warn!("Corrupted or invalid image: {} - {}", entry.path().display(), reason);
            report.corrupted.push(CorruptImage {
                path: entry.into_path(),
                reason,
            });
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn flags_files_that_do_not_decode() {
        let root = tempfile::tempdir().unwrap();
        let class_dir = root.path().join("healthy");
        fs::create_dir(&class_dir).unwrap();
        image::RgbImage::new(4, 4).save(class_dir.join("ok.png")).unwrap();
        fs::write(class_dir.join("broken.jpg"), b"\xff\xd8\xff truncated").unwrap();
        fs::write(class_dir.join("notes.txt"), b"hello").unwrap();

        let report = check_images(root.path()).unwrap();
        assert_eq!(report.scanned, 3);

        let mut names: Vec<_> = report
            .corrupted
            .iter()
            .map(|c| c.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["broken.jpg", "notes.txt"]);
    }

    #[test]
    fn clean_tree_reports_nothing() {
        let root = tempfile::tempdir().unwrap();
        image::RgbImage::new(2, 2).save(root.path().join("a.png")).unwrap();
        assert!(check_images(root.path()).unwrap().corrupted.is_empty());
    }
}
