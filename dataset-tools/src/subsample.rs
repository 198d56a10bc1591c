use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::classes::{class_dirs, copy_into, files_in, is_image};
use crate::error::{DatasetError, Result};
use crate::make_rng;

#[derive(Debug, Clone)]
pub struct SubsampleConfig {
    /// Images kept per class; smaller classes are copied whole.
    pub per_class: usize,
    pub seed: Option<u64>,
}

impl Default for SubsampleConfig {
    fn default() -> Self {
        Self {
            per_class: 38,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassSample {
    pub available: usize,
    pub copied: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SubsampleReport {
    pub classes: BTreeMap<String, ClassSample>,
}

impl SubsampleReport {
    pub fn total_copied(&self) -> usize {
        self.classes.values().map(|c| c.copied).sum()
    }
}

/// Copies a random `per_class` images of every class under `source` into the
/// same class layout under `target`. A file that fails to copy is logged and skipped.
pub fn subsample(source: &Path, target: &Path, config: &SubsampleConfig) -> Result<SubsampleReport> {
    let classes = class_dirs(source)?;
    fs::create_dir_all(target).map_err(DatasetError::io(target))?;

    let mut rng = make_rng(config.seed);
    let mut report = SubsampleReport::default();

    for class in classes {
        log::info!("Processing class: {}", class.name);
        let mut images: Vec<_> = files_in(&class.path)?
            .into_iter()
            .filter(|p| is_image(p))
            .collect();
        let available = images.len();
        images.shuffle(&mut rng);
        images.truncate(config.per_class);

        let class_target = target.join(&class.name);
        fs::create_dir_all(&class_target).map_err(DatasetError::io(&class_target))?;

        let mut copied = 0;
        for src in &images {
            match copy_into(src, &class_target) {
                Ok(dst) => {
                    log::debug!("Copied {} -> {}", src.display(), dst.display());
                    copied += 1;
                }
                Err(e) => log::error!("Error copying {}: {}", src.display(), e),
            }
        }

        report
            .classes
            .insert(class.name, ClassSample { available, copied });
    }

    log::info!(
        "Reduced dataset created with up to {} images per class ({} total)",
        config.per_class,
        report.total_copied()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populate(root: &Path, class: &str, images: usize, extras: &[&str]) {
        let dir = root.join(class);
        fs::create_dir_all(&dir).unwrap();
        for i in 0..images {
            fs::write(dir.join(format!("img_{i:03}.jpg")), format!("{class}-{i}")).unwrap();
        }
        for extra in extras {
            fs::write(dir.join(extra), "x").unwrap();
        }
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn caps_each_class_and_skips_non_images() {
        let source = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        populate(source.path(), "Early Blight", 10, &["notes.txt"]);
        populate(source.path(), "healthy", 2, &["Thumbs.db"]);

        let config = SubsampleConfig {
            per_class: 4,
            seed: Some(7),
        };
        let report = subsample(source.path(), target.path(), &config).unwrap();

        assert_eq!(
            report.classes["Early Blight"],
            ClassSample {
                available: 10,
                copied: 4
            }
        );
        assert_eq!(
            report.classes["healthy"],
            ClassSample {
                available: 2,
                copied: 2
            }
        );
        assert_eq!(report.total_copied(), 6);

        let copied = names(&target.path().join("Early Blight"));
        assert_eq!(copied.len(), 4);
        assert!(copied.iter().all(|n| n.ends_with(".jpg")));
    }

    #[test]
    fn same_seed_picks_same_files() {
        let source = tempfile::tempdir().unwrap();
        populate(source.path(), "Leaf Mold", 20, &[]);
        let config = SubsampleConfig {
            per_class: 5,
            seed: Some(42),
        };

        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        subsample(source.path(), first.path(), &config).unwrap();
        subsample(source.path(), second.path(), &config).unwrap();

        assert_eq!(
            names(&first.path().join("Leaf Mold")),
            names(&second.path().join("Leaf Mold"))
        );
    }
}
