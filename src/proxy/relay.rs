//! Chunked relay of streaming upstream bodies.
//!
//! Upstream bytes are re-emitted as frames of at most [`RELAY_CHUNK_SIZE`]
//! bytes. Each frame is handed to the server as soon as it is read, so it is
//! written out before the relay waits on the upstream again.
//!
//! The relay never fails the response body: once the status line is out, a
//! broken upstream can only end the stream early. Read errors are logged.

use std::convert::Infallible;
use std::pin::Pin;

use axum::body::Bytes;
use futures_util::stream::{self, Stream, StreamExt};

use crate::http::request::RequestId;

/// Maximum size of a relayed frame.
pub const RELAY_CHUNK_SIZE: usize = 4 * 1024;

struct RelayState<S> {
    upstream: Pin<Box<S>>,
    pending: Bytes,
    request_id: RequestId,
    relayed: u64,
    finished: bool,
}

impl<S> Drop for RelayState<S> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(
                request_id = %self.request_id,
                relayed_bytes = self.relayed,
                "Stream relay cancelled by client"
            );
        }
    }
}

/// Wrap an upstream byte stream for relaying to the client.
pub fn relay<S, E>(upstream: S, request_id: RequestId) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = RelayState {
        upstream: Box::pin(upstream),
        pending: Bytes::new(),
        request_id,
        relayed: 0,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if !state.pending.is_empty() {
                let len = state.pending.len().min(RELAY_CHUNK_SIZE);
                let chunk = state.pending.split_to(len);
                state.relayed += len as u64;
                return Some((Ok(chunk), state));
            }

            match state.upstream.next().await {
                Some(Ok(bytes)) => state.pending = bytes,
                Some(Err(e)) => {
                    tracing::error!(
                        request_id = %state.request_id,
                        relayed_bytes = state.relayed,
                        error = %e,
                        "Failed to read stream chunk"
                    );
                    state.finished = true;
                    return None;
                }
                None => {
                    tracing::debug!(
                        request_id = %state.request_id,
                        relayed_bytes = state.relayed,
                        "Stream relay complete"
                    );
                    state.finished = true;
                    return None;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(bytes: &'static [u8]) -> Result<Bytes, String> {
        Ok(Bytes::from_static(bytes))
    }

    async fn collect<S: Stream<Item = Result<Bytes, Infallible>>>(s: S) -> Vec<Bytes> {
        s.map(|r| match r {
            Ok(b) => b,
            Err(never) => match never {},
        })
        .collect()
        .await
    }

    #[tokio::test]
    async fn test_small_chunks_pass_through() {
        let upstream = stream::iter(vec![ok(b"event: a\n\n"), ok(b""), ok(b"event: b\n\n")]);
        let frames = collect(relay(upstream, RequestId::from("r"))).await;
        assert_eq!(frames, vec![Bytes::from_static(b"event: a\n\n"), Bytes::from_static(b"event: b\n\n")]);
    }

    #[tokio::test]
    async fn test_large_chunk_is_split() {
        let big = Bytes::from(vec![b'x'; RELAY_CHUNK_SIZE * 2 + 10]);
        let upstream = stream::iter(vec![Ok::<_, String>(big.clone())]);
        let frames = collect(relay(upstream, RequestId::from("r"))).await;

        assert_eq!(frames.iter().map(Bytes::len).collect::<Vec<_>>(), vec![RELAY_CHUNK_SIZE, RELAY_CHUNK_SIZE, 10]);
        assert_eq!(frames.concat(), big.to_vec());
    }

    #[tokio::test]
    async fn test_error_ends_stream_after_delivered_bytes() {
        let upstream = stream::iter(vec![ok(b"first"), Err("connection reset".to_string()), ok(b"never")]);
        let frames = collect(relay(upstream, RequestId::from("r"))).await;
        assert_eq!(frames, vec![Bytes::from_static(b"first")]);
    }
}
