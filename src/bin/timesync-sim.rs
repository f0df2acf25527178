//! Runs a handful of local peers with skewed clocks and lets one node
//! synchronize against them over loopback TCP.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn, Level};

use stake_timesync::core::{Error, Height, Importance, PeerKey, Result, TimeSyncConfig, Timestamp};
use stake_timesync::protocol::{serve_connection, FramedRequester, NetworkTimeResponder};
use stake_timesync::sync::{ChainView, ImportanceSnapshot, ImportanceView, NodeCandidate, TimeSyncTask};
use stake_timesync::time::{LocalClock, SystemClock};
use stake_timesync::TimeSynchronizationState;

/// Clock skew of each simulated peer in milliseconds, paired with its importance
const PEERS: [(i64, u64); 6] = [
    (1_200, 4_000_000),
    (900, 2_500_000),
    (1_100, 1_500_000),
    (1_000, 1_000_000),
    (-40_000, 20_000),
    (300, 5_000),
];

/// Skew of the synchronizing node
const LOCAL_SKEW_MILLIS: i64 = -500;

const ROUNDS: usize = 12;

/// System clock shifted by a fixed amount
struct SkewedClock {
    skew_millis: i64,
}

impl LocalClock for SkewedClock {
    fn now(&self, epoch_adjustment: Duration) -> Timestamp {
        let now = SystemClock.now(epoch_adjustment);
        Timestamp(now.0.saturating_add_signed(self.skew_millis))
    }
}

struct SimulatedChain {
    importances: ImportanceSnapshot,
    peers: Vec<PeerKey>,
}

impl ImportanceView for SimulatedChain {
    fn importance(&self, key: &PeerKey, height: Height) -> Importance {
        self.importances.importance(key, height)
    }

    fn high_value_account_count(&self) -> usize {
        self.importances.high_value_account_count()
    }
}

impl ChainView for SimulatedChain {
    fn height(&self) -> Height {
        Height(1)
    }

    fn candidates(&self) -> Vec<NodeCandidate> {
        self.peers.iter().copied().map(NodeCandidate::active).collect()
    }
}

/// Starts a peer answering network time requests on a loopback port
async fn spawn_peer(config: &TimeSyncConfig, skew_millis: i64) -> Result<SocketAddr> {
    let state = TimeSynchronizationState::with_clock(
        config.epoch_adjustment,
        config.clock_adjustment_threshold_millis,
        Arc::new(SkewedClock { skew_millis }),
    );
    let responder = NetworkTimeResponder::new(Arc::new(state));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(%addr, error = %e, "failed to accept connection");
                    continue;
                }
            };
            let responder = responder.clone();
            tokio::spawn(async move {
                if let Err(e) = serve_connection(stream, &responder).await {
                    warn!(%addr, error = %e, "connection failed");
                }
            });
        }
    });

    Ok(addr)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let mut config = TimeSyncConfig::default();
    config.max_nodes = PEERS.len();

    let mut importances = ImportanceSnapshot::new();
    let mut addresses = HashMap::new();
    let mut peers = Vec::with_capacity(PEERS.len());
    for (skew_millis, importance) in PEERS {
        let key = PeerKey::random();
        let addr = spawn_peer(&config, skew_millis).await?;
        importances.set(key, Importance(importance), Height(1));
        addresses.insert(key, addr);
        peers.push(key);
        info!(peer = %key, %addr, skew_millis, importance, "started peer");
    }
    config.total_chain_importance = importances.total_importance();

    let addresses = Arc::new(addresses);
    let requester = FramedRequester::new(move |node: PeerKey| -> BoxFuture<'static, Result<TcpStream>> {
        let addresses = addresses.clone();
        Box::pin(async move {
            let addr = addresses
                .get(&node)
                .copied()
                .ok_or_else(|| Error::sync(format!("No address for peer {}", node)))?;
            Ok(TcpStream::connect(addr).await?)
        })
    });

    let chain = SimulatedChain { importances, peers };
    let state = Arc::new(TimeSynchronizationState::with_clock(
        config.epoch_adjustment,
        config.clock_adjustment_threshold_millis,
        Arc::new(SkewedClock {
            skew_millis: LOCAL_SKEW_MILLIS,
        }),
    ));
    let task = TimeSyncTask::new(config, Arc::new(requester), state)?;

    println!("Running {} rounds against {} peers", ROUNDS, PEERS.len());
    for round in 1..=ROUNDS {
        let report = task.run_round(&chain).await;
        println!(
            "round {:>2}: {} samples, offset {:>6} ms, applied {}, total offset {:>6} ms",
            round,
            report.samples,
            report.offset.0,
            report.applied,
            task.state().offset().0
        );
    }

    let counters = task.counters();
    println!("\nFinal counters:");
    println!("- Absolute offset: {} ms", counters.offset_abs);
    println!("- Direction: {}", counters.offset_direction);
    println!("- Node age: {}", counters.node_age);
    println!("- Requests sent: {}", counters.total_requests);

    Ok(())
}
