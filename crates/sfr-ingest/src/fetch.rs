//! Upstream archive fetch
//!
//! Thin wrapper over the shared HTTP client: request the archive, verify
//! the response status, and hand back the chunked byte stream for the tee.

use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use sfr_common::{IngestError, Result};
use tracing::{debug, instrument};

/// Status reported when the request never produced an upstream response
const NO_RESPONSE_STATUS: u16 = 502;

/// Fetch the archive at `url`, returning its body as an ordered chunk
/// stream. A non-success status or a connection failure is a per-record
/// transport failure carrying the upstream status where one exists.
#[instrument(skip(client))]
pub async fn fetch_archive(
    client: &reqwest::Client,
    url: &str,
) -> Result<impl Stream<Item = std::io::Result<Bytes>> + Send + Unpin + 'static> {
    let response = client.get(url).send().await.map_err(|e| {
        IngestError::Transport {
            status: e.status().map(|s| s.as_u16()).unwrap_or(NO_RESPONSE_STATUS),
            message: e.to_string(),
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(IngestError::Transport {
            status: status.as_u16(),
            message: format!("upstream responded {} for {}", status, url),
        });
    }

    debug!(
        content_length = ?response.content_length(),
        "Streaming archive body"
    );

    // Mid-stream failures surface as io errors so both tee consumers see
    // the truncation rather than a silent early end-of-stream.
    Ok(response
        .bytes_stream()
        .map_err(|e| std::io::Error::other(e.to_string()))
        .boxed())
}
