//! The shared real-time connection and the capability surface consumers
//! see it through.

mod connection;
mod hub;
mod loopback;
pub mod protocol;

pub use connection::Socket;
pub use hub::Subscription;
pub use loopback::Loopback;

use crate::Result;
use maffisol_types::Identity;
use serde_json::Value;

/// What a consumer may do with the real-time connection.
///
/// Implementations are cheap handles onto one underlying connection, so
/// they are cloned into every task that needs them.
pub trait Channel: Clone + Send + Sync + 'static {
    /// Tells the server which wallet this connection speaks for. The
    /// server's acknowledgement is logged, never awaited.
    fn register_identity(&self, identity: &Identity) -> Result<()>;

    /// Starts receiving every payload pushed under `event`.
    fn subscribe(&self, event: &str) -> Subscription;

    fn unsubscribe(&self, subscription: Subscription) {
        drop(subscription);
    }

    fn emit(&self, event: &str, args: Vec<Value>) -> Result<()>;
}
