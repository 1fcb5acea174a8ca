use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Share of responses whose status code is in the 2xx class, in percent.
///
/// `0.0` for an empty histogram.
pub fn success_rate(status_code: &BTreeMap<u16, u64>) -> f64 {
    let total: u64 = status_code.values().sum();
    if total == 0 {
        return 0.0;
    }
    let success: u64 = status_code
        .iter()
        .filter(|(code, _)| **code / 100 == 2)
        .map(|(_, count)| count)
        .sum();
    success as f64 * 100.0 / total as f64
}

/// Response-time summary in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSummary {
    pub fastest: u64,
    pub slowest: u64,
    /// Integer mean.
    pub mean: u64,
    /// Element at `n / 2` of the sorted samples; even counts are not averaged.
    pub median: u64,
}

impl TimeSummary {
    /// `None` when there are no samples.
    pub fn from_samples(samples: &[u64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        let n = sorted.len();
        let sum: u128 = sorted.iter().map(|&v| v as u128).sum();
        Some(Self {
            fastest: sorted[0],
            slowest: sorted[n - 1],
            mean: (sum / n as u128) as u64,
            median: sorted[n / 2],
        })
    }
}

/// Response-size summary in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeSummary {
    pub smallest: u64,
    pub largest: u64,
}

impl SizeSummary {
    pub fn from_samples(samples: &[u64]) -> Option<Self> {
        let smallest = samples.iter().copied().min()?;
        let largest = samples.iter().copied().max()?;
        Some(Self { smallest, largest })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_takes_upper_middle() {
        let s = TimeSummary::from_samples(&[10, 20, 30, 40]).unwrap();
        assert_eq!(s.median, 30);
        assert_eq!(s.mean, 25);
        assert_eq!((s.fastest, s.slowest), (10, 40));
    }

    #[test]
    fn samples_are_sorted_first() {
        let s = TimeSummary::from_samples(&[7, 1, 5]).unwrap();
        assert_eq!(s, TimeSummary { fastest: 1, slowest: 7, mean: 4, median: 5 });
    }

    #[test]
    fn mean_truncates() {
        assert_eq!(TimeSummary::from_samples(&[1, 2]).unwrap().mean, 1);
    }

    #[test]
    fn empty_samples() {
        assert!(TimeSummary::from_samples(&[]).is_none());
        assert!(SizeSummary::from_samples(&[]).is_none());
    }

    #[test]
    fn size_bounds() {
        let s = SizeSummary::from_samples(&[300, 120, 4_096]).unwrap();
        assert_eq!(s, SizeSummary { smallest: 120, largest: 4_096 });
    }

    #[test]
    fn success_rate_counts_2xx_only() {
        let hist = BTreeMap::from([(200, 150), (204, 49), (301, 1), (503, 0)]);
        assert!((success_rate(&hist) - 99.5).abs() < 1e-9);
        assert_eq!(success_rate(&BTreeMap::new()), 0.0);
        assert_eq!(success_rate(&BTreeMap::from([(404, 3)])), 0.0);
    }
}
