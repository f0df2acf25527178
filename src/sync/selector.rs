use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::{Height, Importance, PeerKey};
use super::importance::ImportanceView;

/// How a node became known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeSource {
    /// The node itself
    Local,
    /// Configured at startup
    Static,
    /// Discovered at runtime
    Dynamic,
}

/// A node that could be asked for its network time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCandidate {
    pub identity: PeerKey,
    pub source: NodeSource,
    /// True if the node has an active connection for the time sync service
    pub is_active: bool,
}

impl NodeCandidate {
    /// Active, dynamically discovered candidate
    pub fn active(identity: PeerKey) -> Self {
        NodeCandidate {
            identity,
            source: NodeSource::Dynamic,
            is_active: true,
        }
    }
}

/// Candidate together with its selection weight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedCandidate {
    pub identity: PeerKey,
    pub weight: u64,
}

/// Picks up to `max_candidates` identities from weighted candidates with the given total weight
pub type WeightedSelector = Box<dyn Fn(&[WeightedCandidate], u64, usize) -> Vec<PeerKey> + Send + Sync>;

/// Selects nodes to sample with a probability proportional to their importance
pub struct ImportanceAwareNodeSelector {
    max_nodes: usize,
    min_importance: Importance,
    selector: WeightedSelector,
}

impl ImportanceAwareNodeSelector {
    /// Creates a selector picking nodes at random, weighted by importance
    pub fn new(max_nodes: usize, min_importance: Importance) -> Self {
        Self::with_selector(
            max_nodes,
            min_importance,
            Box::new(|candidates: &[WeightedCandidate], total_weight: u64, max_candidates: usize| {
                select_candidates(candidates, total_weight, max_candidates, &mut rand::thread_rng())
            }),
        )
    }

    /// Creates a selector delegating the final pick to `selector`
    pub fn with_selector(max_nodes: usize, min_importance: Importance, selector: WeightedSelector) -> Self {
        ImportanceAwareNodeSelector {
            max_nodes,
            min_importance,
            selector,
        }
    }

    /// Selects up to `max_nodes` qualifying candidates
    ///
    /// A candidate qualifies if it is remote, actively connected and has at
    /// least the minimum importance at `height`.
    pub fn select_nodes<V>(&self, view: &V, candidates: &[NodeCandidate], height: Height) -> Vec<PeerKey>
    where
        V: ImportanceView + ?Sized,
    {
        let mut total_weight = 0u64;
        let mut weighted = Vec::new();
        for candidate in candidates {
            if candidate.source == NodeSource::Local || !candidate.is_active {
                continue;
            }

            let importance = view.importance(&candidate.identity, height);
            if importance < self.min_importance {
                trace!(peer = %candidate.identity, importance = importance.0, "node importance too low");
                continue;
            }

            total_weight = total_weight.saturating_add(importance.0);
            weighted.push(WeightedCandidate {
                identity: candidate.identity,
                weight: importance.0,
            });
        }

        if weighted.is_empty() {
            return Vec::new();
        }

        (self.selector)(&weighted, total_weight, self.max_nodes)
    }
}

/// Weighted random selection without replacement
pub fn select_candidates<R>(
    candidates: &[WeightedCandidate],
    total_weight: u64,
    max_candidates: usize,
    rng: &mut R,
) -> Vec<PeerKey>
where
    R: Rng,
{
    let mut remaining: Vec<_> = candidates.to_vec();
    let mut remaining_weight = total_weight;
    let mut selected = Vec::with_capacity(max_candidates.min(candidates.len()));

    while selected.len() < max_candidates && !remaining.is_empty() && remaining_weight > 0 {
        let target = rng.gen_range(0..remaining_weight);
        let mut cumulative = 0u64;
        let index = remaining
            .iter()
            .position(|candidate| {
                cumulative = cumulative.saturating_add(candidate.weight);
                cumulative > target
            })
            .unwrap_or(remaining.len() - 1);

        let chosen = remaining.swap_remove(index);
        remaining_weight = remaining_weight.saturating_sub(chosen.weight);
        selected.push(chosen.identity);
    }

    selected
}
