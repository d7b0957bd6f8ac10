pub mod api;
pub mod events;
pub mod identity;
pub mod lock;
pub mod rules;
pub mod social;

pub use events::{EventError, PushEvent};
pub use identity::{Identity, IdentityError};
pub use lock::{format_remaining, JailStatus, TimedLock};
