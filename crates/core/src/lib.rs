//! # Rulecraft Core
//!
//! Domain types, capability traits, and error definitions for the Rulecraft
//! automation assistant. This crate has **no framework dependencies**: it
//! defines the model that the dialog, code generator and parser crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (address book, messaging, discovery, user
//! context, schema registry, semantic parser) is a trait here. Real backends
//! live elsewhere; [`in_memory`] provides implementations for tests and for
//! running offline.

pub mod capability;
pub mod command;
pub mod error;
pub mod event;
pub mod ids;
pub mod in_memory;
pub mod parser;
pub mod slot;
pub mod types;
pub mod value;

// Re-export key types at crate root for ergonomics
pub use capability::{
    AddressBook, ContactMatch, DeviceRegistry, DiscoveredDevice, Discovery, IdGenerator,
    InstalledDevice, Messaging, SchemaRegistry, UserContext,
};
pub use command::{Choice, Command, Intent, ListKind, Prompt, Reply, ValueCategory};
pub use error::{CapabilityError, Error, ParserError, Result};
pub use event::{DialogEvent, EventBus};
pub use parser::{Candidate, CommandParser};
pub use slot::{
    ChannelSchema, ChannelType, Comparison, Invocation, KindType, Operator, Resolved, Scope, Slot,
};
pub use types::{Type, TypeError, unify};
pub use value::{Contact, FeedHandle, Location, Value};
