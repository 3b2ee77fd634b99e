//! Chunked media transfer
//!
//! Content is fetched in `Range` requests of a fixed size and appended to the
//! target file until the server reports the end of the content. There is no
//! resume state: a failed transfer is restarted from byte zero by the next
//! retry attempt.

use crate::discovery::ServiceClient;
use crate::error::{classify_http_failure, DriveError, Result};
use bridge_traits::http::{HttpMethod, HttpRequest};
use bridge_traits::storage::FileSystemAccess;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument, warn};

/// Download `url` into `path`, returning the number of bytes written.
///
/// The target file is closed on every exit path.
#[instrument(skip(client, fs, url, path), fields(path = %path.display()))]
pub(crate) async fn download_to_path(
    client: &ServiceClient,
    fs: &dyn FileSystemAccess,
    url: &str,
    path: &Path,
    chunk_size: u64,
) -> Result<u64> {
    let mut writer = fs.open_write_stream(path).await?;

    let transferred = copy_chunks(client, &mut writer, url, chunk_size).await;
    let closed = writer.shutdown().await;

    match (transferred, closed) {
        (Ok(total), Ok(())) => {
            debug!(bytes = total, "Download complete");
            Ok(total)
        }
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                warn!(error = %close_err, "Failed to close partial download");
            }
            Err(e)
        }
    }
}

async fn copy_chunks<W>(
    client: &ServiceClient,
    writer: &mut W,
    url: &str,
    chunk_size: u64,
) -> Result<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let chunk_size = chunk_size.max(1);
    let mut offset: u64 = 0;

    loop {
        let range = format!("bytes={}-{}", offset, offset + chunk_size - 1);
        let request = HttpRequest::new(HttpMethod::Get, url).header("Range", range);
        let response = client.send(request).await?;

        match response.status {
            206 => {
                let received = response.body.len() as u64;
                if received == 0 {
                    break;
                }
                writer.write_all(&response.body).await?;
                offset += received;

                let total = response.header("Content-Range").and_then(content_range_total);
                debug!(offset, total = ?total, "Chunk received");

                match total {
                    Some(total) if offset >= total => break,
                    None if received < chunk_size => break,
                    _ => {}
                }
            }
            // Range ignored; the body is the whole content.
            200 if offset == 0 => {
                writer.write_all(&response.body).await?;
                offset = response.body.len() as u64;
                break;
            }
            200 => {
                return Err(DriveError::InvalidResponse(format!(
                    "server ignored range request at offset {}",
                    offset
                )))
            }
            // Nothing at or past `offset`: empty content, or an exact multiple
            // of the chunk size without a reported total.
            416 => break,
            status => return Err(classify_http_failure(status, &response.body, url)),
        }
    }

    writer.flush().await?;
    Ok(offset)
}

/// Total length from `bytes a-b/total`; `None` when the total is `*`.
fn content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_range_total() {
        assert_eq!(content_range_total("bytes 0-524287/1048576"), Some(1048576));
        assert_eq!(content_range_total("bytes 0-9/*"), None);
        assert_eq!(content_range_total("garbage"), None);
    }
}
