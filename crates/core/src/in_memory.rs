//! In-memory capabilities: useful for testing and for running without
//! any external services.

use crate::capability::{
    AddressBook, ContactMatch, DeviceRegistry, DiscoveredDevice, Discovery, InstalledDevice,
    Messaging, SchemaRegistry, UserContext,
};
use crate::error::{CapabilityError, Error, Result};
use crate::slot::{ChannelSchema, ChannelType, Slot};
use crate::types::Type;
use crate::value::{Contact, FeedHandle, Value};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// One address-book entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressEntry {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// An address book held in a Vec.
#[derive(Default)]
pub struct InMemoryAddressBook {
    entries: Arc<RwLock<Vec<AddressEntry>>>,
}

impl InMemoryAddressBook {
    pub fn new(entries: Vec<AddressEntry>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    pub async fn add(&self, entry: AddressEntry) {
        self.entries.write().await.push(entry);
    }
}

#[async_trait]
impl AddressBook for InMemoryAddressBook {
    async fn lookup(
        &self,
        ty: &Type,
        name: &str,
    ) -> std::result::Result<Vec<ContactMatch>, CapabilityError> {
        let needle = name.to_lowercase();
        let entries = self.entries.read().await;
        let matches = entries
            .iter()
            .filter(|e| e.name.to_lowercase().contains(&needle))
            .filter_map(|e| {
                let contact = |value: &String| Contact {
                    value: value.clone(),
                    display: Some(e.name.clone()),
                };
                let value = match ty {
                    Type::PhoneNumber => e.phone.as_ref().map(|p| Value::PhoneNumber(contact(p))),
                    Type::EmailAddress | Type::Any => {
                        e.email.as_ref().map(|m| Value::EmailAddress(contact(m)))
                    }
                    _ => None,
                }?;
                Some(ContactMatch {
                    display_name: e.name.clone(),
                    value,
                })
            })
            .collect();
        Ok(matches)
    }
}

/// A messaging account with a fixed list of feeds.
pub struct StaticMessaging {
    feeds: Vec<FeedHandle>,
}

impl StaticMessaging {
    pub fn new(feeds: Vec<FeedHandle>) -> Self {
        Self { feeds }
    }
}

#[async_trait]
impl Messaging for StaticMessaging {
    async fn feeds(&self) -> std::result::Result<Vec<FeedHandle>, CapabilityError> {
        Ok(self.feeds.clone())
    }
}

/// Discovery over a fixed set of nearby devices.
pub struct StaticDiscovery {
    nearby: Vec<DiscoveredDevice>,
}

impl StaticDiscovery {
    pub fn new(nearby: Vec<DiscoveredDevice>) -> Self {
        Self { nearby }
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn discover(
        &self,
        name: &str,
        timeout: Duration,
    ) -> std::result::Result<Vec<DiscoveredDevice>, CapabilityError> {
        debug!(name, timeout_ms = timeout.as_millis() as u64, "Static discovery");
        let needle = name.to_lowercase();
        Ok(self
            .nearby
            .iter()
            .filter(|d| {
                d.kind.to_lowercase().contains(&needle) || d.name.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn stop(&self) -> std::result::Result<(), CapabilityError> {
        Ok(())
    }
}

/// User context held in a map.
#[derive(Default)]
pub struct InMemoryUserContext {
    values: Arc<RwLock<HashMap<String, Value>>>,
}

impl InMemoryUserContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: HashMap<String, Value>) -> Self {
        Self {
            values: Arc::new(RwLock::new(values)),
        }
    }
}

#[async_trait]
impl UserContext for InMemoryUserContext {
    async fn read(&self, key: &str) -> std::result::Result<Option<Value>, CapabilityError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn store(&self, key: &str, value: Value) -> std::result::Result<(), CapabilityError> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Schemas held in a map, keyed by `(kind, channel, type)`.
#[derive(Default)]
pub struct InMemorySchemas {
    schemas: HashMap<(String, String, ChannelType), ChannelSchema>,
}

impl InMemorySchemas {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with the builtin timer and notification channels.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.insert(
            ChannelSchema::new(
                "builtin",
                "timer",
                ChannelType::Trigger,
                vec![
                    Slot::new("interval", Type::Measure("ms".into()))
                        .required()
                        .with_question("How often should I check?"),
                ],
            )
            .with_confirmation("every $interval"),
        );
        registry.insert(
            ChannelSchema::new("builtin", "notify", ChannelType::Action, vec![])
                .with_confirmation("notify you"),
        );
        registry.insert(
            ChannelSchema::new(
                "builtin",
                "say",
                ChannelType::Action,
                vec![Slot::new("message", Type::String).required()],
            )
            .global()
            .with_confirmation("say $message"),
        );
        registry
    }

    pub fn insert(&mut self, schema: ChannelSchema) {
        let key = (
            schema.kind.clone(),
            schema.channel.clone(),
            schema.channel_type,
        );
        self.schemas.insert(key, schema);
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[async_trait]
impl SchemaRegistry for InMemorySchemas {
    async fn get_schema(
        &self,
        kind: &str,
        channel: &str,
        channel_type: ChannelType,
    ) -> Result<ChannelSchema> {
        self.schemas
            .get(&(kind.to_string(), channel.to_string(), channel_type))
            .cloned()
            .ok_or_else(|| Error::UnknownChannel {
                kind: kind.into(),
                channel: channel.into(),
            })
    }

    async fn schemas_for(&self, kinds: &[String]) -> Vec<ChannelSchema> {
        let mut found: Vec<ChannelSchema> = self
            .schemas
            .values()
            .filter(|s| kinds.contains(&s.kind))
            .cloned()
            .collect();
        found.sort_by(|a, b| (&a.kind, &a.channel).cmp(&(&b.kind, &b.channel)));
        found
    }
}

/// Configured devices held in a Vec.
#[derive(Default)]
pub struct InMemoryDevices {
    devices: Arc<RwLock<Vec<InstalledDevice>>>,
}

impl InMemoryDevices {
    pub fn new(devices: Vec<InstalledDevice>) -> Self {
        Self {
            devices: Arc::new(RwLock::new(devices)),
        }
    }

    pub async fn add(&self, device: InstalledDevice) {
        self.devices.write().await.push(device);
    }
}

#[async_trait]
impl DeviceRegistry for InMemoryDevices {
    async fn devices(&self) -> Vec<InstalledDevice> {
        self.devices.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> InMemoryAddressBook {
        InMemoryAddressBook::new(vec![
            AddressEntry {
                name: "Bob Smith".into(),
                email: Some("bob@example.com".into()),
                phone: Some("+15550100".into()),
            },
            AddressEntry {
                name: "Bobby Tables".into(),
                email: None,
                phone: Some("+15550199".into()),
            },
        ])
    }

    #[tokio::test]
    async fn address_book_types_matches() {
        let book = book();
        let emails = book.lookup(&Type::EmailAddress, "bob").await.unwrap();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].value, Value::EmailAddress(Contact {
            value: "bob@example.com".into(),
            display: Some("Bob Smith".into()),
        }));

        let phones = book.lookup(&Type::PhoneNumber, "BOB").await.unwrap();
        assert_eq!(phones.len(), 2);
    }

    #[tokio::test]
    async fn user_context_store_and_read() {
        let ctx = InMemoryUserContext::new();
        assert!(ctx.read("location.home").await.unwrap().is_none());
        ctx.store("location.home", Value::String("x".into())).await.unwrap();
        assert_eq!(
            ctx.read("location.home").await.unwrap(),
            Some(Value::String("x".into()))
        );
    }

    #[tokio::test]
    async fn schema_lookup_by_type() {
        let schemas = InMemorySchemas::with_builtins();
        assert!(
            schemas
                .get_schema("builtin", "timer", ChannelType::Trigger)
                .await
                .is_ok()
        );
        let err = schemas
            .get_schema("builtin", "timer", ChannelType::Action)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownChannel { .. }));
        assert_eq!(schemas.schemas_for(&["builtin".into()]).await.len(), 3);
    }

    #[tokio::test]
    async fn discovery_filters_by_name() {
        let discovery = StaticDiscovery::new(vec![DiscoveredDevice {
            id: "bt-1".into(),
            kind: "fitbit".into(),
            name: "Fitbit Charge".into(),
            description: String::new(),
        }]);
        let timeout = Duration::from_secs(1);
        assert_eq!(discovery.discover("fitbit", timeout).await.unwrap().len(), 1);
        assert!(discovery.discover("hue", timeout).await.unwrap().is_empty());
    }
}
