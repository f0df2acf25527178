use std::cmp::Ordering;
use std::collections::btree_set;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::{CommunicationTimestamps, PeerKey};

/// Outcome of one network time exchange with a peer
///
/// `local` holds the times this node sent its request and received the reply,
/// `remote` holds the times the peer received the request and sent its reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSynchronizationSample {
    identity: PeerKey,
    local: CommunicationTimestamps,
    remote: CommunicationTimestamps,
}

impl TimeSynchronizationSample {
    /// Creates a sample from the timestamps of one exchange
    pub fn new(identity: PeerKey, local: CommunicationTimestamps, remote: CommunicationTimestamps) -> Self {
        TimeSynchronizationSample { identity, local, remote }
    }

    /// Key of the sampled peer
    pub fn identity(&self) -> &PeerKey {
        &self.identity
    }

    /// Timestamps observed by this node
    pub fn local_timestamps(&self) -> &CommunicationTimestamps {
        &self.local
    }

    /// Timestamps reported by the peer
    pub fn remote_timestamps(&self) -> &CommunicationTimestamps {
        &self.remote
    }

    /// Round trip as seen locally.
    ///
    /// Wraps for reversed local timestamps, so such samples look implausibly slow.
    pub fn duration(&self) -> u64 {
        self.local.receive.0.wrapping_sub(self.local.send.0)
    }

    /// Estimated offset of the peer's clock relative to the local clock
    ///
    /// The half round trip term uses integer division truncating toward zero.
    pub fn time_offset_to_remote(&self) -> i64 {
        let local_duration = self.local.receive.0 as i64 - self.local.send.0 as i64;
        let remote_duration = self.remote.send.0 as i64 - self.remote.receive.0 as i64;
        self.remote.receive.0 as i64 - self.local.send.0 as i64 - (local_duration - remote_duration) / 2
    }
}

impl Ord for TimeSynchronizationSample {
    // Offset first, then identity; the timestamps only separate otherwise identical keys.
    fn cmp(&self, other: &Self) -> Ordering {
        self.time_offset_to_remote()
            .cmp(&other.time_offset_to_remote())
            .then_with(|| self.identity.cmp(&other.identity))
            .then_with(|| self.local.cmp(&other.local))
            .then_with(|| self.remote.cmp(&other.remote))
    }
}

impl PartialOrd for TimeSynchronizationSample {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Samples of one round ordered by ascending time offset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSynchronizationSamples {
    samples: BTreeSet<TimeSynchronizationSample>,
}

impl TimeSynchronizationSamples {
    /// Creates an empty sample set
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sample, returning false if an identical sample is already present
    pub fn insert(&mut self, sample: TimeSynchronizationSample) -> bool {
        self.samples.insert(sample)
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the set holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterates samples in ascending offset order
    pub fn iter(&self) -> btree_set::Iter<'_, TimeSynchronizationSample> {
        self.samples.iter()
    }

    /// Keeps only the samples for which `keep` returns true
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&TimeSynchronizationSample) -> bool,
    {
        self.samples.retain(keep);
    }

    /// Removes up to `count` samples from each end of the ordering
    pub fn trim(&mut self, count: usize) {
        for _ in 0..count {
            if self.samples.pop_first().is_none() || self.samples.pop_last().is_none() {
                break;
            }
        }
    }

    /// Identities of all sampled peers in sample order
    pub fn identities(&self) -> Vec<PeerKey> {
        self.samples.iter().map(|sample| *sample.identity()).collect()
    }
}

impl FromIterator<TimeSynchronizationSample> for TimeSynchronizationSamples {
    fn from_iter<I: IntoIterator<Item = TimeSynchronizationSample>>(iter: I) -> Self {
        TimeSynchronizationSamples {
            samples: iter.into_iter().collect(),
        }
    }
}

impl Extend<TimeSynchronizationSample> for TimeSynchronizationSamples {
    fn extend<I: IntoIterator<Item = TimeSynchronizationSample>>(&mut self, iter: I) {
        self.samples.extend(iter);
    }
}

impl IntoIterator for TimeSynchronizationSamples {
    type Item = TimeSynchronizationSample;
    type IntoIter = btree_set::IntoIter<TimeSynchronizationSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.into_iter()
    }
}

impl<'a> IntoIterator for &'a TimeSynchronizationSamples {
    type Item = &'a TimeSynchronizationSample;
    type IntoIter = btree_set::Iter<'a, TimeSynchronizationSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

/// Helpers for building samples in tests across the crate
#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    /// Key whose bytes are all `byte`
    pub fn key(byte: u8) -> PeerKey {
        PeerKey([byte; crate::core::types::PEER_KEY_SIZE])
    }

    /// Sample with a zero round trip and the given offset
    pub fn sample_with_offset(identity: PeerKey, offset: i64) -> TimeSynchronizationSample {
        let remote = offset.max(0) as u64;
        let local = (-offset).max(0) as u64;
        TimeSynchronizationSample::new(
            identity,
            CommunicationTimestamps::new(local, local),
            CommunicationTimestamps::new(remote, remote),
        )
    }

    /// Samples with random keys and offsets `start, start + 1, ...`
    pub fn samples_with_increasing_offset(start: i64, count: usize) -> TimeSynchronizationSamples {
        (0..count)
            .map(|i| sample_with_offset(PeerKey::random(), start + i as i64))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;

    fn sample(identity: PeerKey, local: (u64, u64), remote: (u64, u64)) -> TimeSynchronizationSample {
        TimeSynchronizationSample::new(
            identity,
            CommunicationTimestamps::new(local.0, local.1),
            CommunicationTimestamps::new(remote.0, remote.1),
        )
    }

    fn reference_samples() -> Vec<TimeSynchronizationSample> {
        vec![
            sample(key(1), (5, 17), (25, 23)),
            sample(key(2), (8, 12), (45, 45)),
            sample(key(4), (37, 43), (15, 13)),
            sample(key(3), (0, 19), (15, 13)),
            sample(key(2), (40, 46), (18, 16)),
        ]
    }

    #[test]
    fn test_time_offset_to_remote() {
        let samples = reference_samples();
        assert_eq!(samples[0].time_offset_to_remote(), 13);
        assert_eq!(samples[1].time_offset_to_remote(), 35);
        assert_eq!(samples[2].time_offset_to_remote(), -26);
        assert_eq!(samples[3].time_offset_to_remote(), 5);
        assert_eq!(samples[4].time_offset_to_remote(), -26);
    }

    #[test]
    fn test_half_round_trip_truncates_toward_zero() {
        // local duration 19, remote duration 2: (19 - 2) / 2 = 8
        assert_eq!(sample(key(1), (0, 19), (15, 13)).time_offset_to_remote(), 5);

        // local duration 0, remote duration 3: (0 - 3) / 2 = -1, not -2
        assert_eq!(sample(key(1), (10, 10), (23, 20)).time_offset_to_remote(), 11);
    }

    #[test]
    fn test_duration() {
        assert_eq!(sample(key(1), (5, 17), (25, 23)).duration(), 12);
        assert_eq!(sample(key(1), (17, 5), (25, 23)).duration(), u64::MAX - 11);
    }

    #[test]
    fn test_samples_are_ordered_by_offset_then_identity() {
        let samples: TimeSynchronizationSamples = reference_samples().into_iter().collect();

        let ordered: Vec<_> = samples
            .iter()
            .map(|sample| (sample.time_offset_to_remote(), *sample.identity()))
            .collect();
        assert_eq!(
            ordered,
            vec![(-26, key(2)), (-26, key(4)), (5, key(3)), (13, key(1)), (35, key(2))]
        );
    }

    #[test]
    fn test_equal_offsets_from_different_peers_are_kept() {
        let mut samples = TimeSynchronizationSamples::new();
        assert!(samples.insert(sample_with_offset(key(1), 100)));
        assert!(samples.insert(sample_with_offset(key(2), 100)));
        assert!(!samples.insert(sample_with_offset(key(1), 100)));
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn test_trim_removes_both_ends() {
        let mut samples: TimeSynchronizationSamples =
            (0..6).map(|i| sample_with_offset(key(i as u8), i)).collect();

        samples.trim(2);
        let offsets: Vec<_> = samples.iter().map(|s| s.time_offset_to_remote()).collect();
        assert_eq!(offsets, vec![2, 3]);

        samples.trim(5);
        assert!(samples.is_empty());
    }

    #[test]
    fn test_sample_with_offset_helper() {
        assert_eq!(sample_with_offset(key(1), 250).time_offset_to_remote(), 250);
        assert_eq!(sample_with_offset(key(1), -150).time_offset_to_remote(), -150);
        assert_eq!(sample_with_offset(key(1), 0).time_offset_to_remote(), 0);
    }
}
