//! # Rulecraft Dialog
//!
//! The conversational half of Rulecraft: a [`Session`] keeps a stack of
//! [`Flow`]s and feeds each user command to the flow on top.
//!
//! ```text
//! Command ─▶ Session ─▶ Default ─▶ Rule ─▶ SlotFilling ─▶ ContactSearch
//!                                                      └▶ UserContext
//!                      └▶ Discovery
//!                      └▶ List
//! ```
//!
//! The pieces a host embeds without a session are [`assign_slots`] and
//! [`resolve_invocation`].

pub mod assign;
pub mod concretize;
pub mod contact_search;
pub mod context;
pub mod default;
pub mod discovery;
pub mod flow;
pub mod list;
pub mod rule;
pub mod session;
pub mod slot_filling;
pub mod user_context;

pub use assign::{SlotAssignment, assign_slots};
pub use concretize::{Placeholder, classify};
pub use context::{Capabilities, DISCOVERY_TIMEOUT, DialogSettings, Turn};
pub use flow::{Flow, FlowOutcome, FlowResult};
pub use session::Session;
pub use slot_filling::{Resolution, SlotFillingDialog, resolve_invocation};
