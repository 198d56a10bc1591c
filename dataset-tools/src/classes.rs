use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DatasetError, Result};

pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, Clone)]
pub struct ClassDir {
    pub name: String,
    pub path: PathBuf,
}

/// Subdirectories of `root`, sorted by name. Loose files at the top level are ignored.
pub fn class_dirs(root: &Path) -> Result<Vec<ClassDir>> {
    if !root.is_dir() {
        return Err(DatasetError::NotADirectory(root.to_path_buf()));
    }

    let mut classes = Vec::new();
    for entry in fs::read_dir(root).map_err(DatasetError::io(root))? {
        let entry = entry.map_err(DatasetError::io(root))?;
        let path = entry.path();
        if path.is_dir() {
            classes.push(ClassDir {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
            });
        }
    }
    classes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(classes)
}

/// Regular files directly inside `dir`, sorted by name.
pub fn files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(DatasetError::io(dir))? {
        let path = entry.map_err(DatasetError::io(dir))?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

/// Copies `src` into `dir`, keeping its file name.
pub(crate) fn copy_into(src: &Path, dir: &Path) -> Result<PathBuf> {
    let name = src.file_name().ok_or_else(|| DatasetError::Io {
        path: src.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
    })?;
    let dst = dir.join(name);
    fs::copy(src, &dst).map_err(DatasetError::io(src))?;
    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_directories_in_name_order() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("b")).unwrap();
        fs::create_dir(root.path().join("a")).unwrap();
        fs::write(root.path().join("README.txt"), "x").unwrap();

        let names: Vec<_> = class_dirs(root.path())
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("nope");
        assert!(matches!(class_dirs(&missing), Err(DatasetError::NotADirectory(_))));
    }

    #[test]
    fn image_extensions_ignore_case() {
        assert!(is_image(Path::new("x/leaf.JPG")));
        assert!(is_image(Path::new("leaf.jpeg")));
        assert!(!is_image(Path::new("leaf.gif")));
        assert!(!is_image(Path::new("jpg")));
    }
}
