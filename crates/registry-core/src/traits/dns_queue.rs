// # DNS Refresh Queue Trait
//
// After an update commits, the domain's zone data must be republished. The
// coordinator only enqueues the request; delivery is at-least-once and
// unordered, and happens outside the update.

use async_trait::async_trait;

/// Trait for DNS refresh queue implementations
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Hand the name to a delivery mechanism
///
/// ## Forbidden Capabilities
/// - ❌ Block the update on delivery
/// - ❌ Access the entity store
#[async_trait]
pub trait DnsRefreshQueue: Send + Sync {
    /// Request a refresh of one domain
    ///
    /// # Parameters
    ///
    /// - `fully_qualified_name`: The domain to republish
    async fn enqueue_refresh(&self, fully_qualified_name: &str) -> Result<(), crate::Error>;

    /// Queue name (for logging/debugging)
    fn queue_name(&self) -> &'static str;
}
