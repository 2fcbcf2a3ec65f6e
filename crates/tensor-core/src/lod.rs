// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Level-of-detail (nested sequence length) descriptors for ragged batches.
//!
//! A `Lod` is a list of offset levels. `[[0, 2, 5]]` says the leading
//! dimension holds two sequences: rows `0..2` and rows `2..5`. With more
//! levels, each level indexes into the next, and the last level indexes
//! rows of the tensor.

use crate::TensorError;

/// Nested offset levels; empty means "not a ragged tensor".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Lod(Vec<Vec<u64>>);

impl Lod {
    pub fn new(levels: Vec<Vec<u64>>) -> Self {
        Self(levels)
    }

    pub fn levels(&self) -> &[Vec<u64>] {
        &self.0
    }

    pub fn num_levels(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks the descriptor against a tensor whose leading dimension is
    /// `leading_dim`.
    ///
    /// # Checks
    /// - Every level is non-empty and non-decreasing.
    /// - Each level's last offset equals the number of entries the next
    ///   level describes.
    /// - The last level ends at `leading_dim`.
    pub fn validate(&self, leading_dim: usize) -> Result<(), TensorError> {
        for (i, level) in self.0.iter().enumerate() {
            if level.is_empty() {
                return Err(TensorError::InvalidLod(format!("level {i} is empty")));
            }
            if level.windows(2).any(|w| w[0] > w[1]) {
                return Err(TensorError::InvalidLod(format!(
                    "level {i} offsets are not non-decreasing: {level:?}"
                )));
            }
        }
        for (i, pair) in self.0.windows(2).enumerate() {
            let end = pair[0].last().copied().unwrap_or(0);
            let next_entries = pair[1].len() as u64 - 1;
            if end != next_entries {
                return Err(TensorError::InvalidLod(format!(
                    "level {i} ends at {end} but level {} describes {next_entries} entries",
                    i + 1
                )));
            }
        }
        if let Some(last) = self.0.last() {
            let end = last.last().copied().unwrap_or(0);
            if end != leading_dim as u64 {
                return Err(TensorError::InvalidLod(format!(
                    "last level ends at {end} but the leading dimension is {leading_dim}"
                )));
            }
        }
        Ok(())
    }
}

impl From<Vec<Vec<u64>>> for Lod {
    fn from(levels: Vec<Vec<u64>>) -> Self {
        Self(levels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_always_valid() {
        Lod::default().validate(0).unwrap();
        Lod::default().validate(7).unwrap();
    }

    #[test]
    fn test_single_level() {
        let lod = Lod::new(vec![vec![0, 2, 5]]);
        lod.validate(5).unwrap();
        assert!(lod.validate(4).is_err());
    }

    #[test]
    fn test_two_levels() {
        // Two paragraphs of 1 and 2 sentences; sentences span 3 + 1 + 2 rows.
        let lod = Lod::new(vec![vec![0, 1, 3], vec![0, 3, 4, 6]]);
        lod.validate(6).unwrap();
    }

    #[test]
    fn test_levels_must_chain() {
        let lod = Lod::new(vec![vec![0, 2], vec![0, 3, 4, 6]]);
        assert!(lod.validate(6).is_err());
    }

    #[test]
    fn test_decreasing_rejected() {
        let lod = Lod::new(vec![vec![0, 3, 2]]);
        assert!(lod.validate(2).is_err());
    }
}
