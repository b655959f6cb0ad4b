use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// Lifecycle of one transport client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// Status reported to the host as the connection changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Connecting,
    Ok,
    ConnectionFailure,
    BadConfig,
    Disconnected,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Connecting => "connecting",
            Status::Ok => "ok",
            Status::ConnectionFailure => "connection_failure",
            Status::BadConfig => "bad_config",
            Status::Disconnected => "disconnected",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection state shared between a client and its reader task.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedState(Arc<Mutex<ConnectionState>>);

impl SharedState {
    pub(crate) fn get(&self) -> ConnectionState {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set(&self, state: ConnectionState) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_as_host_strings() {
        let json = serde_json::to_string(&Status::ConnectionFailure).unwrap();
        assert_eq!(json, "\"connection_failure\"");
        assert_eq!(Status::BadConfig.to_string(), "bad_config");
    }

    #[test]
    fn shared_state_is_visible_across_clones() {
        let state = SharedState::default();
        let reader_side = state.clone();
        assert_eq!(state.get(), ConnectionState::Disconnected);

        reader_side.set(ConnectionState::Failed);
        assert_eq!(state.get(), ConnectionState::Failed);
    }
}
