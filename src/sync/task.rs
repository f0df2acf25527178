use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, BoxFuture};
use serde::Serialize;
use tokio::time::interval;
use tracing::{info, warn};

use crate::core::{
    CommunicationTimestamps, Error, Height, NodeAge, PeerKey, Result, TimeOffset, TimeSyncConfig, Timestamp,
};
use super::importance::ImportanceView;
use super::sample::{TimeSynchronizationSample, TimeSynchronizationSamples};
use super::selector::{ImportanceAwareNodeSelector, NodeCandidate};
use super::state::TimeSynchronizationState;
use super::synchronizer::TimeSynchronizer;

/// Name of the periodic synchronization task
pub const TASK_NAME: &str = "time synchronization task";

/// Performs the remote half of a network time exchange
pub trait SampleRequester: Send + Sync {
    /// Asks `node` for the times it received the request and sent its reply
    fn request_timestamps(&self, node: PeerKey) -> BoxFuture<'static, Result<CommunicationTimestamps>>;
}

/// Chain state a round reads from
pub trait ChainView: ImportanceView + Send + Sync {
    /// Height importances are evaluated at
    fn height(&self) -> Height;

    /// Nodes that may be asked for samples
    fn candidates(&self) -> Vec<NodeCandidate>;
}

/// Exchanges timestamps with all `nodes` concurrently
///
/// Local timestamps are read from `network_time` right before each request and
/// right after its reply. Nodes that fail or do not answer within `timeout` are
/// left out of the result.
pub async fn retrieve_samples<R, F>(
    nodes: &[PeerKey],
    requester: &R,
    network_time: F,
    timeout: Duration,
) -> TimeSynchronizationSamples
where
    R: SampleRequester + ?Sized,
    F: Fn() -> Timestamp + Sync,
{
    let network_time = &network_time;
    let exchanges = nodes.iter().map(move |node| {
        let node = *node;
        async move {
            let send = network_time();
            let result = exchange_timestamps(requester, node, timeout).await;
            let receive = network_time();

            match result {
                Ok(remote) => Some(TimeSynchronizationSample::new(
                    node,
                    CommunicationTimestamps { send, receive },
                    remote,
                )),
                Err(error) => {
                    warn!(peer = %node, %error, "network time request failed");
                    None
                }
            }
        }
    });

    join_all(exchanges).await.into_iter().flatten().collect()
}

/// Requests remote timestamps from `node`, failing with `Error::Timeout` after `timeout`
async fn exchange_timestamps<R>(requester: &R, node: PeerKey, timeout: Duration) -> Result<CommunicationTimestamps>
where
    R: SampleRequester + ?Sized,
{
    tokio::time::timeout(timeout, requester.request_timestamps(node))
        .await
        .map_err(|_| Error::timeout(format!("No response from {} within {:?}", node, timeout)))?
}

/// Summary of one synchronization round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundReport {
    pub selected_nodes: usize,
    pub samples: usize,
    pub offset: TimeOffset,
    pub applied: bool,
    pub node_age: NodeAge,
}

/// Diagnostic counters of the time synchronization service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSyncCounters {
    pub offset_abs: u64,
    /// 0 for positive offsets, 1 for negative ones
    pub offset_direction: u64,
    pub node_age: u64,
    pub total_requests: u64,
}

/// Drives synchronization rounds
pub struct TimeSyncTask {
    config: TimeSyncConfig,
    synchronizer: TimeSynchronizer,
    selector: ImportanceAwareNodeSelector,
    requester: Arc<dyn SampleRequester>,
    state: Arc<TimeSynchronizationState>,
    total_requests: AtomicU64,
}

impl TimeSyncTask {
    /// Creates a task with the standard filters and selector described by `config`
    pub fn new(
        config: TimeSyncConfig,
        requester: Arc<dyn SampleRequester>,
        state: Arc<TimeSynchronizationState>,
    ) -> Result<Self> {
        config.validate()?;
        let synchronizer = TimeSynchronizer::from_config(&config);
        let selector = ImportanceAwareNodeSelector::new(config.max_nodes, config.min_importance);
        Ok(Self::with_components(config, synchronizer, selector, requester, state))
    }

    /// Creates a task from preassembled parts
    pub fn with_components(
        config: TimeSyncConfig,
        synchronizer: TimeSynchronizer,
        selector: ImportanceAwareNodeSelector,
        requester: Arc<dyn SampleRequester>,
        state: Arc<TimeSynchronizationState>,
    ) -> Self {
        TimeSyncTask {
            config,
            synchronizer,
            selector,
            requester,
            state,
            total_requests: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        TASK_NAME
    }

    pub fn state(&self) -> &Arc<TimeSynchronizationState> {
        &self.state
    }

    /// Snapshot of the diagnostic counters
    pub fn counters(&self) -> TimeSyncCounters {
        TimeSyncCounters {
            offset_abs: self.state.absolute_offset(),
            offset_direction: self.state.offset_direction().as_raw(),
            node_age: self.state.node_age().0,
            total_requests: self.total_requests.load(Ordering::Relaxed),
        }
    }

    /// Runs a single round: select, sample, estimate, update
    pub async fn run_round<C>(&self, chain: &C) -> RoundReport
    where
        C: ChainView + ?Sized,
    {
        let height = chain.height();
        let nodes = self.selector.select_nodes(chain, &chain.candidates(), height);
        self.total_requests.fetch_add(nodes.len() as u64, Ordering::Relaxed);

        let state = &self.state;
        let samples = retrieve_samples(
            &nodes,
            self.requester.as_ref(),
            || state.network_time(),
            self.config.request_timeout,
        )
        .await;
        let num_samples = samples.len();

        let node_age = state.node_age();
        let offset = self.synchronizer.calculate_time_offset(chain, height, samples, node_age);
        let applied = state.update(offset);

        let report = RoundReport {
            selected_nodes: nodes.len(),
            samples: num_samples,
            offset,
            applied,
            node_age: state.node_age(),
        };
        info!(
            selected_nodes = report.selected_nodes,
            samples = report.samples,
            offset = offset.0,
            applied,
            total_offset = state.offset().0,
            node_age = report.node_age.0,
            "completed time synchronization round"
        );
        report
    }

    /// Runs rounds forever at the configured interval
    pub async fn run<C>(&self, chain: &C)
    where
        C: ChainView + ?Sized,
    {
        let mut round_interval = interval(self.config.round_interval);
        loop {
            round_interval.tick().await;
            self.run_round(chain).await;
        }
    }
}

/// Requester failing every exchange; useful before any transport is wired up
#[derive(Debug, Clone, Copy, Default)]
pub struct UnreachableRequester;

impl SampleRequester for UnreachableRequester {
    fn request_timestamps(&self, node: PeerKey) -> BoxFuture<'static, Result<CommunicationTimestamps>> {
        Box::pin(async move { Err(Error::sync(format!("no transport to {}", node))) })
    }
}
