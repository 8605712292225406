// # DNS Refresh Queue Implementations
//
// Channel-backed queue: refresh requests are handed to whoever holds the
// receiving end (a publisher task, or a test).

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Error;
use crate::traits::DnsRefreshQueue;

/// DNS refresh queue backed by an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelDnsQueue {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelDnsQueue {
    /// Create a queue and the receiver that yields enqueued domain names
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl DnsRefreshQueue for ChannelDnsQueue {
    async fn enqueue_refresh(&self, fully_qualified_name: &str) -> Result<(), Error> {
        self.tx
            .send(fully_qualified_name.to_string())
            .map_err(|_| Error::dns_queue("DNS refresh receiver has been dropped"))
    }

    fn queue_name(&self) -> &'static str {
        "channel"
    }
}
