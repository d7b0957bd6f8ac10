use super::{hub::Hub, Channel, Subscription};
use crate::Result;
use maffisol_types::Identity;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Default)]
struct Record {
    identities: Vec<Identity>,
    emitted: Vec<(String, Vec<Value>)>,
}

/// In-memory [`Channel`]: records what is sent and delivers whatever the
/// caller injects with [`Loopback::deliver`].
#[derive(Clone, Default)]
pub struct Loopback {
    hub: Hub,
    record: Arc<Mutex<Record>>,
}

impl Loopback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `args` under `event` to current subscribers.
    pub fn deliver(&self, event: &str, args: Vec<Value>) -> usize {
        self.hub.dispatch(event, &args)
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.hub.listener_count(event)
    }

    pub fn identities(&self) -> Vec<Identity> {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .identities
            .clone()
    }

    pub fn emitted(&self) -> Vec<(String, Vec<Value>)> {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .emitted
            .clone()
    }
}

impl Channel for Loopback {
    fn register_identity(&self, identity: &Identity) -> Result<()> {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .identities
            .push(identity.clone());
        Ok(())
    }

    fn subscribe(&self, event: &str) -> Subscription {
        self.hub.subscribe(event)
    }

    fn emit(&self, event: &str, args: Vec<Value>) -> Result<()> {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .emitted
            .push((event.to_string(), args));
        Ok(())
    }
}
