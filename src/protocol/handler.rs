use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, trace};

use crate::core::{CommunicationTimestamps, Error, PeerKey, Result, Timestamp};
use crate::sync::{SampleRequester, TimeSynchronizationState};
use super::codec::MessageCodec;
use super::message::Message;

/// Answers network time requests with this node's network time
#[derive(Debug, Clone)]
pub struct NetworkTimeResponder {
    state: Arc<TimeSynchronizationState>,
}

impl NetworkTimeResponder {
    pub fn new(state: Arc<TimeSynchronizationState>) -> Self {
        NetworkTimeResponder { state }
    }

    /// Current network time of this node
    pub fn network_time(&self) -> Timestamp {
        self.state.network_time()
    }

    /// Builds the response to `message`, which arrived at `received_at`
    pub fn respond(&self, message: Message, received_at: Timestamp) -> Result<Message> {
        match message {
            Message::NetworkTimeRequest => Ok(Message::NetworkTimeResponse {
                timestamps: CommunicationTimestamps {
                    send: self.network_time(),
                    receive: received_at,
                },
            }),
            other => Err(Error::protocol(format!("Cannot respond to {}", other.kind()))),
        }
    }
}

/// Answers requests arriving on `io` until the peer closes the stream
pub async fn serve_connection<T>(io: T, responder: &NetworkTimeResponder) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(io, MessageCodec::new());
    while let Some(message) = framed.next().await {
        let message = message?;
        let received_at = responder.network_time();
        trace!(kind = message.kind(), received_at = received_at.0, "received message");

        let response = responder.respond(message, received_at)?;
        framed.send(response).await?;
    }

    debug!("network time connection closed");
    Ok(())
}

/// Sends a network time request on `io` and waits for the response
pub async fn request_network_time<T>(io: T) -> Result<CommunicationTimestamps>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(io, MessageCodec::new());
    framed.send(Message::NetworkTimeRequest).await?;

    match framed.next().await {
        Some(Ok(Message::NetworkTimeResponse { timestamps })) => Ok(timestamps),
        Some(Ok(other)) => Err(Error::protocol(format!("Expected network time response, got {}", other.kind()))),
        Some(Err(e)) => Err(e),
        None => Err(Error::protocol("Connection closed before network time response")),
    }
}

/// Requester opening a stream per exchange through a connector
pub struct FramedRequester<F, T> {
    connect: F,
    _stream: PhantomData<fn() -> T>,
}

impl<F, T> FramedRequester<F, T>
where
    F: Fn(PeerKey) -> BoxFuture<'static, Result<T>> + Send + Sync,
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Creates a requester that reaches peers through `connect`
    pub fn new(connect: F) -> Self {
        FramedRequester {
            connect,
            _stream: PhantomData,
        }
    }
}

impl<F, T> SampleRequester for FramedRequester<F, T>
where
    F: Fn(PeerKey) -> BoxFuture<'static, Result<T>> + Send + Sync,
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn request_timestamps(&self, node: PeerKey) -> BoxFuture<'static, Result<CommunicationTimestamps>> {
        let connecting = (self.connect)(node);
        Box::pin(async move {
            let io = connecting.await?;
            request_network_time(io).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TimeOffset;
    use crate::sync::retrieve_samples;
    use crate::time::ManualClock;
    use std::time::Duration;
    use tokio::io::duplex;

    fn create_state(local: u64, offset: i64) -> Arc<TimeSynchronizationState> {
        let state = TimeSynchronizationState::with_clock(
            Duration::ZERO,
            0,
            Arc::new(ManualClock::new(Timestamp(local))),
        );
        state.update(TimeOffset(offset));
        Arc::new(state)
    }

    #[test]
    fn test_responder_uses_network_time() {
        let responder = NetworkTimeResponder::new(create_state(1_000, 500));

        let response = responder.respond(Message::NetworkTimeRequest, Timestamp(1_400)).unwrap();

        assert_eq!(
            response,
            Message::NetworkTimeResponse {
                timestamps: CommunicationTimestamps::new(1_500, 1_400),
            }
        );
    }

    #[test]
    fn test_responder_rejects_responses() {
        let responder = NetworkTimeResponder::new(create_state(1_000, 0));
        let message = Message::NetworkTimeResponse {
            timestamps: CommunicationTimestamps::default(),
        };

        assert!(matches!(responder.respond(message, Timestamp(0)), Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_request_over_duplex_stream() {
        let responder = NetworkTimeResponder::new(create_state(50_000, 250));
        let (client, server) = duplex(1024);
        let server_task = tokio::spawn(async move { serve_connection(server, &responder).await });

        let timestamps = request_network_time(client).await.unwrap();

        assert_eq!(timestamps, CommunicationTimestamps::new(50_250, 50_250));
        server_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_request_fails_when_peer_hangs_up() {
        let (client, server) = duplex(1024);
        drop(server);

        assert!(request_network_time(client).await.is_err());
    }

    #[tokio::test]
    async fn test_framed_requester_produces_samples() {
        let remote_state = create_state(20_000, 0);
        let requester = FramedRequester::new(move |_node: PeerKey| -> BoxFuture<'static, Result<_>> {
            let responder = NetworkTimeResponder::new(remote_state.clone());
            Box::pin(async move {
                let (client, server) = duplex(1024);
                tokio::spawn(async move { serve_connection(server, &responder).await });
                Ok(client)
            })
        });

        let local_state = create_state(19_000, 0);
        let nodes = vec![PeerKey::random(), PeerKey::random()];
        let samples = retrieve_samples(
            &nodes,
            &requester,
            || local_state.network_time(),
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(samples.len(), 2);
        for sample in &samples {
            assert_eq!(sample.time_offset_to_remote(), 1_000);
        }
    }
}
