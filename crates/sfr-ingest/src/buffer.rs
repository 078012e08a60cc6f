//! Whole-document buffer accumulation
//!
//! Drains one tee branch into a single contiguous buffer in arrival order.
//! The operation either fully succeeds or fails; a partial buffer is never
//! returned as if complete.

use bytes::Bytes;
use sfr_common::{IngestError, Result};
use tokio::sync::mpsc;
use tracing::debug;

/// Accumulate a chunk stream into one in-memory buffer.
///
/// An `Err` chunk means the underlying stream failed before completion and
/// yields [`IngestError::StreamToBuffer`]; whatever was gathered so far is
/// discarded.
pub async fn accumulate(mut rx: mpsc::Receiver<std::io::Result<Bytes>>) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();

    while let Some(item) = rx.recv().await {
        match item {
            Ok(chunk) => buffer.extend_from_slice(&chunk),
            Err(e) => {
                return Err(IngestError::StreamToBuffer(format!(
                    "stream failed after {} bytes: {}",
                    buffer.len(),
                    e
                )))
            },
        }
    }

    debug!(bytes = buffer.len(), "Accumulated full document");
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_accumulates_in_arrival_order() {
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            for part in [&b"one"[..], b"two", b"three"] {
                tx.send(Ok(Bytes::copy_from_slice(part))).await.unwrap();
            }
        });

        let buffer = accumulate(rx).await.unwrap();
        assert_eq!(buffer, b"onetwothree");
    }

    #[tokio::test]
    async fn test_empty_stream_yields_empty_buffer() {
        let (tx, rx) = mpsc::channel::<std::io::Result<Bytes>>(1);
        drop(tx);
        let buffer = accumulate(rx).await.unwrap();
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_mid_stream_error_discards_partial_buffer() {
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            tx.send(Ok(Bytes::from_static(b"partial"))).await.unwrap();
            tx.send(Err(std::io::Error::other("reset"))).await.unwrap();
        });

        let err = accumulate(rx).await.unwrap_err();
        assert!(matches!(err, IngestError::StreamToBuffer(_)));
    }
}
