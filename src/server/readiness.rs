//! Readiness detection on a child's output stream.
//!
//! [`ReadinessWatcher`] scans bytes as they are fed in and flips to ready the
//! first time the marker has appeared anywhere in the cumulative stream, even
//! when it straddles chunk boundaries. [`pump`] drains a reader into a
//! watcher until end of stream, so the child never blocks on a full pipe.

use parking_lot::Mutex;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tracing::debug;
use tracing::trace;

const READ_BUF_SIZE: usize = 8 * 1024;

pub struct ReadinessWatcher {
    marker: Vec<u8>,
    /// Longest suffix of the stream so far that is a proper prefix of `marker`
    partial: Mutex<Vec<u8>>,
    ready_tx: watch::Sender<bool>,
}

impl ReadinessWatcher {
    pub fn new(marker: impl Into<Vec<u8>>) -> Self {
        let marker = marker.into();
        let (ready_tx, _) = watch::channel(marker.is_empty());
        Self {
            partial: Mutex::new(Vec::with_capacity(marker.len())),
            marker,
            ready_tx,
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.ready_tx.borrow()
    }

    /// Scans the next chunk of the stream.
    pub fn feed(
        &self,
        chunk: &[u8],
    ) {
        if chunk.is_empty() || self.is_ready() {
            return;
        }

        let mut partial = self.partial.lock();
        partial.extend_from_slice(chunk);

        if partial.windows(self.marker.len()).any(|w| w == self.marker.as_slice()) {
            partial.clear();
            trace!("readiness marker observed");
            self.ready_tx.send_replace(true);
            return;
        }

        let keep = longest_prefix_suffix(&partial, &self.marker);
        let drop_len = partial.len() - keep;
        partial.drain(..drop_len);
    }

    /// Resolves once the marker has been observed. Never resolves otherwise;
    /// callers bound it with a timeout.
    pub async fn wait(&self) {
        let mut rx = self.ready_tx.subscribe();
        // the sender lives in `self`, so the channel cannot close under us
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

/// Length of the longest suffix of `buf` that is a proper prefix of `marker`.
fn longest_prefix_suffix(
    buf: &[u8],
    marker: &[u8],
) -> usize {
    let max = marker.len().saturating_sub(1).min(buf.len());
    (1..=max)
        .rev()
        .find(|&k| buf[buf.len() - k..] == marker[..k])
        .unwrap_or(0)
}

/// Drains `reader` into `watcher` until end of stream, copying every byte to
/// `mirror` when one is given.
///
/// Mirror write failures stop the mirroring but not the draining.
pub async fn pump<R, W>(
    mut reader: R,
    watcher: std::sync::Arc<ReadinessWatcher>,
    mut mirror: Option<W>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; READ_BUF_SIZE];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!("output stream read failed: {:?}", e);
                break;
            }
        };

        watcher.feed(&buf[..n]);

        let mirror_failed = match mirror.as_mut() {
            Some(w) => w.write_all(&buf[..n]).await.and(w.flush().await).is_err(),
            None => false,
        };
        if mirror_failed {
            debug!("mirror sink closed, continuing without it");
            mirror = None;
        }
    }
    trace!("output stream closed");
}
