// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Channel partitioning for processing elements.
//!
//! A processing element handles at most `max_channels_per_pe` channels, and
//! every group it is given must be a multiple of both the vector lane width
//! and the group alignment. A wide operator is therefore cut into groups of
//! `capacity` channels, the last group taking the remainder:
//!
//! ```text
//! unit     = lcm(group_alignment, lane_width)
//! capacity = max(unit, floor(max_channels_per_pe / unit) * unit)
//! groups   = ceil(channels / capacity)
//! ```

/// Limits of one processing element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PeConfig {
    /// Channels processed per vector instruction.
    pub lane_width: usize,
    /// Channel groups must start at multiples of this.
    pub group_alignment: usize,
    /// Most channels one element accepts.
    pub max_channels_per_pe: usize,
}

impl Default for PeConfig {
    fn default() -> Self {
        Self {
            lane_width: 16,
            group_alignment: 8,
            max_channels_per_pe: 512,
        }
    }
}

impl PeConfig {
    /// Smallest legal group size. Zero limits are treated as 1.
    pub fn unit(&self) -> usize {
        lcm(self.group_alignment.max(1), self.lane_width.max(1))
    }

    /// Channels per full group.
    pub fn capacity(&self) -> usize {
        let unit = self.unit();
        unit.max(self.max_channels_per_pe / unit * unit)
    }
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn lcm(a: usize, b: usize) -> usize {
    a / gcd(a, b) * b
}

/// How a channel axis is divided among processing elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPartition {
    capacity: usize,
    sections: Vec<usize>,
}

impl ChannelPartition {
    /// Partitions `channels` under `config`. Zero channels yields no groups.
    pub fn compute(channels: usize, config: &PeConfig) -> Self {
        let capacity = config.capacity();
        let groups = (channels + capacity - 1) / capacity;
        let sections = (0..groups)
            .map(|g| capacity.min(channels - g * capacity))
            .collect();
        Self { capacity, sections }
    }

    /// Channels in every group but the last.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn num_groups(&self) -> usize {
        self.sections.len()
    }

    /// Channel count of each group.
    pub fn sections(&self) -> &[usize] {
        &self.sections
    }

    /// `(first_channel, count)` of each group.
    pub fn ranges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.sections.iter().scan(0, |start, &n| {
            let range = (*start, n);
            *start += n;
            Some(range)
        })
    }

    pub fn total_channels(&self) -> usize {
        self.sections.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_capacity() {
        let cfg = PeConfig::default();
        assert_eq!(cfg.unit(), 16);
        assert_eq!(cfg.capacity(), 512);
    }

    #[test]
    fn test_unit_is_lcm() {
        let cfg = PeConfig {
            lane_width: 6,
            group_alignment: 4,
            max_channels_per_pe: 50,
        };
        assert_eq!(cfg.unit(), 12);
        assert_eq!(cfg.capacity(), 48);
    }

    #[test]
    fn test_capacity_never_below_unit() {
        let cfg = PeConfig {
            lane_width: 16,
            group_alignment: 8,
            max_channels_per_pe: 10,
        };
        assert_eq!(cfg.capacity(), 16);
    }

    #[test]
    fn test_remainder_in_last_group() {
        let p = ChannelPartition::compute(1100, &PeConfig::default());
        assert_eq!(p.sections(), &[512, 512, 76]);
        let ranges: Vec<_> = p.ranges().collect();
        assert_eq!(ranges, vec![(0, 512), (512, 512), (1024, 76)]);
    }

    #[test]
    fn test_single_group() {
        let p = ChannelPartition::compute(32, &PeConfig::default());
        assert_eq!(p.num_groups(), 1);
        assert_eq!(p.sections(), &[32]);
    }

    #[test]
    fn test_zero_channels() {
        assert_eq!(ChannelPartition::compute(0, &PeConfig::default()).num_groups(), 0);
    }

    proptest! {
        #[test]
        fn prop_partition_covers_channels(
            channels in 1usize..5000,
            lane in 1usize..33,
            align in 1usize..17,
            max in 1usize..1024,
        ) {
            let cfg = PeConfig { lane_width: lane, group_alignment: align, max_channels_per_pe: max };
            let p = ChannelPartition::compute(channels, &cfg);
            let cap = cfg.capacity();

            prop_assert_eq!(p.total_channels(), channels);
            prop_assert_eq!(p.num_groups(), (channels + cap - 1) / cap);
            prop_assert_eq!(cap % cfg.unit(), 0);
            let (last, full) = p.sections().split_last().unwrap();
            prop_assert!(full.iter().all(|&s| s == cap));
            prop_assert!(*last >= 1 && *last <= cap);
        }
    }
}
