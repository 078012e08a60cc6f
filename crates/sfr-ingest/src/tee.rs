//! Byte-stream tee
//!
//! Streams are single-consumption by nature, so fanning one network body
//! out to decomposition and accumulation needs an explicit splitter: a
//! driver task forwards every incoming chunk into two bounded channels in
//! arrival order. Each consumer sees the identical byte sequence; a
//! consumer that drops its receiver stops receiving without stalling the
//! other side, and bounded channel capacity is the only buffering between
//! the branches.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Default per-branch channel capacity, in chunks
pub const DEFAULT_CAPACITY: usize = 32;

/// The two consumer branches plus the driver task handle
pub struct Tee {
    /// Branch consumed by the archive decomposer
    pub left: mpsc::Receiver<std::io::Result<Bytes>>,
    /// Branch consumed by the buffer accumulator
    pub right: mpsc::Receiver<std::io::Result<Bytes>>,
    /// Resolves to the total bytes forwarded once the source is drained
    pub driver: JoinHandle<u64>,
}

/// Split one chunk stream into two identical bounded branches.
///
/// An `Err` chunk from the source is duplicated to both branches and ends
/// forwarding; consumers decide how to classify the failure. Send failures
/// (a consumer hung up) are ignored for that branch only.
pub fn split<S>(mut source: S, capacity: usize) -> Tee
where
    S: Stream<Item = std::io::Result<Bytes>> + Send + Unpin + 'static,
{
    let (left_tx, left_rx) = mpsc::channel(capacity);
    let (right_tx, right_rx) = mpsc::channel(capacity);

    let driver = tokio::spawn(async move {
        let mut forwarded: u64 = 0;
        let mut left_open = true;
        let mut right_open = true;

        while let Some(item) = source.next().await {
            let failed = item.is_err();
            if let Ok(chunk) = &item {
                forwarded += chunk.len() as u64;
                trace!(len = chunk.len(), "Forwarding chunk to both branches");
            }

            let mirror = match &item {
                Ok(chunk) => Ok(chunk.clone()),
                Err(e) => Err(std::io::Error::new(e.kind(), e.to_string())),
            };

            if left_open && left_tx.send(mirror).await.is_err() {
                debug!("Left tee branch hung up");
                left_open = false;
            }
            if right_open && right_tx.send(item).await.is_err() {
                debug!("Right tee branch hung up");
                right_open = false;
            }

            if failed || (!left_open && !right_open) {
                break;
            }
        }

        forwarded
    });

    Tee {
        left: left_rx,
        right: right_rx,
        driver,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_stream(
        chunks: Vec<std::io::Result<Bytes>>,
    ) -> impl Stream<Item = std::io::Result<Bytes>> + Send + Unpin + 'static {
        futures::stream::iter(chunks)
    }

    async fn drain(mut rx: mpsc::Receiver<std::io::Result<Bytes>>) -> Vec<std::io::Result<Bytes>> {
        let mut items = Vec::new();
        while let Some(item) = rx.recv().await {
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn test_both_branches_see_identical_ordered_bytes() {
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"alpha")),
            Ok(Bytes::from_static(b"beta")),
            Ok(Bytes::from_static(b"gamma")),
        ];
        let tee = split(chunk_stream(chunks), 4);

        let (left, right) = tokio::join!(drain(tee.left), drain(tee.right));
        let flatten = |items: Vec<std::io::Result<Bytes>>| -> Vec<u8> {
            items
                .into_iter()
                .flat_map(|i| i.unwrap().to_vec())
                .collect()
        };

        let left_bytes = flatten(left);
        let right_bytes = flatten(right);
        assert_eq!(left_bytes, right_bytes);
        assert_eq!(left_bytes, b"alphabetagamma");
        assert_eq!(tee.driver.await.unwrap(), 14);
    }

    #[tokio::test]
    async fn test_one_consumer_dropping_does_not_stall_the_other() {
        let chunks: Vec<std::io::Result<Bytes>> = (0..100)
            .map(|i| Ok(Bytes::from(vec![i as u8; 64])))
            .collect();
        // Capacity 1 so a stalled branch would block immediately
        let tee = split(chunk_stream(chunks), 1);

        drop(tee.left);

        let right = drain(tee.right).await;
        assert_eq!(right.len(), 100);
        assert_eq!(tee.driver.await.unwrap(), 100 * 64);
    }

    #[tokio::test]
    async fn test_source_error_reaches_both_branches() {
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"head")),
            Err(std::io::Error::other("connection reset")),
        ];
        let tee = split(chunk_stream(chunks), 4);

        let (left, right) = tokio::join!(drain(tee.left), drain(tee.right));
        assert!(left.last().unwrap().is_err());
        assert!(right.last().unwrap().is_err());
        // Only the good chunk counts toward forwarded bytes
        assert_eq!(tee.driver.await.unwrap(), 4);
    }
}
