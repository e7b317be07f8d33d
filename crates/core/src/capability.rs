//! Capability traits: the external collaborators the dialog layer consumes.
//!
//! Each capability is an async trait object so that real backends (an
//! address book service, a device discovery daemon) and in-memory
//! implementations are interchangeable.

use crate::error::{CapabilityError, Result};
use crate::slot::{ChannelSchema, ChannelType};
use crate::types::Type;
use crate::value::{FeedHandle, Value};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A contact entry matched by an address-book lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactMatch {
    pub display_name: String,
    /// The concrete value, typed for the slot that asked (phone or email).
    pub value: Value,
}

/// Look up contacts by name.
#[async_trait]
pub trait AddressBook: Send + Sync {
    /// Find contacts whose name matches `name`, producing values of type `ty`.
    async fn lookup(
        &self,
        ty: &Type,
        name: &str,
    ) -> std::result::Result<Vec<ContactMatch>, CapabilityError>;
}

/// The user's messaging account.
#[async_trait]
pub trait Messaging: Send + Sync {
    /// Feeds (conversations) the user can post to.
    async fn feeds(&self) -> std::result::Result<Vec<FeedHandle>, CapabilityError>;
}

/// A device found by discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub id: String,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Local device discovery (Bluetooth, UPnP, ...).
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Search for devices matching `name`, bounded by `timeout`.
    async fn discover(
        &self,
        name: &str,
        timeout: Duration,
    ) -> std::result::Result<Vec<DiscoveredDevice>, CapabilityError>;

    /// Abort a running search.
    async fn stop(&self) -> std::result::Result<(), CapabilityError>;
}

/// Ambient user context (`$context.location.home`, ...).
#[async_trait]
pub trait UserContext: Send + Sync {
    /// Read a context value by key (the part after `$context.`).
    async fn read(&self, key: &str) -> std::result::Result<Option<Value>, CapabilityError>;

    /// Remember a value the user supplied.
    async fn store(&self, key: &str, value: Value) -> std::result::Result<(), CapabilityError>;
}

/// Channel schemas known to the assistant.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    async fn get_schema(
        &self,
        kind: &str,
        channel: &str,
        channel_type: ChannelType,
    ) -> Result<ChannelSchema>;

    /// All schemas declared for the given device kinds.
    async fn schemas_for(&self, kinds: &[String]) -> Vec<ChannelSchema>;
}

/// A device the user has already configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledDevice {
    pub id: String,
    pub kind: String,
    pub name: String,
}

impl InstalledDevice {
    /// Internal devices that are never shown to the user.
    pub fn is_system(&self) -> bool {
        self.kind == "thingengine-system" || self.kind == "data-source"
    }
}

/// Devices the user has configured.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    async fn devices(&self) -> Vec<InstalledDevice>;
}

/// Source of unique identifiers (sessions, generated programs).
pub trait IdGenerator: Send + Sync {
    fn next_id(&self, prefix: &str) -> String;
}
