//! Component host configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What happens to a component's effects when its host is disconnected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisconnectPolicy {
    /// Effects keep running while disconnected; the view stays live.
    #[default]
    KeepAlive,
    /// Disconnect stops every effect of the instance. Reconnecting starts a
    /// fresh render effect that patches against the retained view.
    StopEffects,
}

/// Settings applied to every host created by a [`Registry`](crate::host::Registry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Behaviour on disconnect
    pub disconnect_policy: DisconnectPolicy,
    /// Prefix prepended to the names of emitted custom events
    pub event_prefix: String,
}

fn default_event_prefix() -> String {
    "custom-".to_string()
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            disconnect_policy: DisconnectPolicy::default(),
            event_prefix: default_event_prefix(),
        }
    }
}

impl HostConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Full event name for a component-emitted event.
    pub fn event_name(&self, name: &str) -> String {
        format!("{}{}", self.event_prefix, name)
    }
}
