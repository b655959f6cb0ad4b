use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use oscwire_frame::OscArg;

/// Most recent arguments received per OSC address.
///
/// One entry per address, last write wins. Shared by the inbound path and
/// the feedback matcher through an `Arc`.
#[derive(Debug, Default)]
pub struct ReceivedStateStore {
    entries: Mutex<HashMap<String, Vec<OscArg>>>,
}

impl ReceivedStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Vec<OscArg>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the entry for `address`.
    pub fn update(&self, address: &str, args: Vec<OscArg>) {
        self.entries().insert(address.to_string(), args);
    }

    pub fn get(&self, address: &str) -> Option<Vec<OscArg>> {
        self.entries().get(address).cloned()
    }

    /// Remove the entry for `address` if it holds at least one argument.
    ///
    /// Check and removal happen under one lock.
    pub fn take_if_present(&self, address: &str) -> bool {
        let mut entries = self.entries();
        match entries.get(address) {
            Some(args) if !args.is_empty() => {
                entries.remove(address);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }
}
