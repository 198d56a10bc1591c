use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::classes::{class_dirs, copy_into, files_in};
use crate::error::{DatasetError, Result};
use crate::make_rng;

#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Fraction of each class copied to the training directory.
    pub ratio: f64,
    pub seed: Option<u64>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            ratio: 0.8,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassSplit {
    pub train: usize,
    pub validation: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SplitReport {
    pub classes: BTreeMap<String, ClassSplit>,
}

/// Number of files that go to training: `floor(len * ratio)`.
pub fn train_count(len: usize, ratio: f64) -> usize {
    (len as f64 * ratio).floor() as usize
}

/// Shuffles each class under `source` and copies the first `ratio` share into
/// `train/<class>` and the remainder into `validation/<class>`.
pub fn split_dataset(
    source: &Path,
    train_dir: &Path,
    validation_dir: &Path,
    config: &SplitConfig,
) -> Result<SplitReport> {
    if !(config.ratio > 0.0 && config.ratio < 1.0) {
        return Err(DatasetError::InvalidRatio(config.ratio));
    }
    let classes = class_dirs(source)?;
    fs::create_dir_all(train_dir).map_err(DatasetError::io(train_dir))?;
    fs::create_dir_all(validation_dir).map_err(DatasetError::io(validation_dir))?;

    let mut rng = make_rng(config.seed);
    let mut report = SplitReport::default();

    for class in classes {
        let mut files = files_in(&class.path)?;
        files.shuffle(&mut rng);
        let (train, validation) = files.split_at(train_count(files.len(), config.ratio));

        for (subset, root) in [(train, train_dir), (validation, validation_dir)] {
            let class_dir = root.join(&class.name);
            fs::create_dir_all(&class_dir).map_err(DatasetError::io(&class_dir))?;
            for src in subset {
                copy_into(src, &class_dir)?;
            }
        }

        log::info!(
            "{}: {} train, {} validation",
            class.name,
            train.len(),
            validation.len()
        );
        report.classes.insert(
            class.name,
            ClassSplit {
                train: train.len(),
                validation: validation.len(),
            },
        );
    }

    log::info!("Dataset split into train and validation sets.");
    Ok(report)
}
