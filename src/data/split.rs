use rand::prelude::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};

use super::model::Dataset;
use crate::error::{FairnessError, Result};

impl Dataset {
    /// Shuffle with a seeded RNG and cut into `(train, test)` where `train`
    /// holds `round(len * fraction)` instances. Both partitions must be
    /// non-empty.
    pub fn split(&self, fraction: f64, seed: u64) -> Result<(Dataset, Dataset)> {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(FairnessError::InvalidSplit(format!(
                "train fraction must be in (0, 1), got {fraction}"
            )));
        }
        let n_train = (self.len() as f64 * fraction).round() as usize;
        if n_train == 0 || n_train >= self.len() {
            return Err(FairnessError::InvalidSplit(format!(
                "{} instances cannot be split at {fraction}",
                self.len()
            )));
        }

        let mut order: Vec<usize> = (0..self.len()).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        order.shuffle(&mut rng);

        let (train_idx, test_idx) = order.split_at(n_train);
        log::debug!(
            "Split {} instances into {} train / {} test (seed {seed})",
            self.len(),
            train_idx.len(),
            test_idx.len()
        );
        Ok((self.subset(train_idx), self.subset(test_idx)))
    }
}
