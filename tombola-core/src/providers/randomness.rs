use crate::error::Result;
use async_trait::async_trait;

/// Same-domain randomness source.
///
/// `request_randomness` allocates a request id synchronously; the random
/// word arrives later through the engine's local callback, attributed to
/// `identity()`.
#[async_trait]
pub trait LocalRandomness: Send + Sync {
    /// Source identity expected on the fulfillment callback.
    fn identity(&self) -> &str;

    async fn request_randomness(&self) -> Result<u64>;
}

/// Randomness relayed from another domain through a messaging bridge.
///
/// Requests carry a fee quoted per request. The provider returns a receipt
/// for the outbound message plus the sequence id its callback will carry.
#[async_trait]
pub trait CrossDomainRandomness: Send + Sync {
    /// Source identity expected on the fulfillment callback.
    fn identity(&self) -> &str;

    /// Current fee for one request, in the bridge's native unit.
    async fn quote_fee(&self) -> Result<u128>;

    /// Issues a request paying at most `max_fee`. Returns (receipt, sequence id).
    async fn request_randomness(&self, max_fee: u128) -> Result<(String, u64)>;
}
