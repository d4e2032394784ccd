use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use std::sync::Arc;

pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Tracks bytes handed to the transport and converts them to a percentage.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: u64,
    sent: u64,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self { total, sent: 0 }
    }

    /// Record `bytes` more sent and return `round(sent * 100 / total)`.
    pub fn advance(&mut self, bytes: u64) -> u8 {
        self.sent = self.sent.saturating_add(bytes).min(self.total);
        self.percent()
    }

    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.sent as f64 * 100.0) / self.total as f64).round() as u8
    }
}

/// Split `data` into chunks and report progress each time the transport
/// pulls one.
pub fn progress_stream(
    data: Bytes,
    chunk_size: usize,
    on_progress: Option<ProgressCallback>,
) -> impl Stream<Item = std::io::Result<Bytes>> + Send + Sync + 'static {
    let chunk_size = chunk_size.max(1);
    let len = data.len();
    let chunks: Vec<Bytes> = (0..len)
        .step_by(chunk_size)
        .map(|start| data.slice(start..(start + chunk_size).min(len)))
        .collect();

    let mut tracker = ProgressTracker::new(len as u64);
    stream::iter(chunks).map(move |chunk| {
        let percent = tracker.advance(chunk.len() as u64);
        if let Some(callback) = &on_progress {
            callback(percent);
        }
        Ok(chunk)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_percent_rounds() {
        let mut tracker = ProgressTracker::new(3);
        assert_eq!(tracker.percent(), 0);
        assert_eq!(tracker.advance(1), 33);
        assert_eq!(tracker.advance(1), 67);
        assert_eq!(tracker.advance(1), 100);
    }

    #[test]
    fn test_percent_never_exceeds_100() {
        let mut tracker = ProgressTracker::new(10);
        assert_eq!(tracker.advance(25), 100);
        assert_eq!(tracker.advance(1), 100);
    }

    #[test]
    fn test_empty_total_is_complete() {
        assert_eq!(ProgressTracker::new(0).percent(), 100);
    }

    #[tokio::test]
    async fn test_stream_reports_monotonic_progress() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let callback: ProgressCallback = Arc::new(move |p| recorder.lock().unwrap().push(p));

        let data = Bytes::from(vec![7u8; 1000]);
        let chunks: Vec<Bytes> = progress_stream(data.clone(), 64, Some(callback))
            .map(|c| c.unwrap())
            .collect()
            .await;

        let reassembled: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        assert_eq!(reassembled, data.to_vec());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 16);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert!(seen.iter().all(|p| *p <= 100));
        assert_eq!(seen.last(), Some(&100));
    }

    #[tokio::test]
    async fn test_stream_without_callback() {
        let chunks: Vec<_> = progress_stream(Bytes::from_static(b"abc"), 2, None)
            .collect()
            .await;
        assert_eq!(chunks.len(), 2);
    }
}
