//! Offline preparation of the crop disease image dataset: corruption scans,
//! per-class subsampling and train/validation splitting.
//!
//! Every tool expects the usual one-directory-per-class layout:
//!
//! ```text
//! dataset/
//!   Early Blight/
//!     img_001.jpg
//!   healthy/
//!     img_002.png
//! ```

pub mod check;
pub mod classes;
pub mod error;
pub mod split;
pub mod subsample;

pub use error::{DatasetError, Result};

use rand::SeedableRng;
use rand::rngs::StdRng;

/// Seeded when reproducibility is wanted, entropy otherwise.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
