//! What a flow can reach while it runs.

use rulecraft_codegen::{ProgramCompiler, SchemaCompiler};
use rulecraft_core::ids::UuidIds;
use rulecraft_core::in_memory::{InMemoryDevices, InMemoryUserContext};
use rulecraft_core::{
    AddressBook, DeviceRegistry, Discovery, IdGenerator, Messaging, Reply, SchemaRegistry,
    UserContext,
};
use std::sync::Arc;
use std::time::Duration;

/// How long a discovery search may run.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Behavioural knobs for a session.
#[derive(Debug, Clone)]
pub struct DialogSettings {
    pub discovery_timeout: Duration,
    /// Ask "is that right?" before handing back a generated program.
    pub confirm_programs: bool,
}

impl Default for DialogSettings {
    fn default() -> Self {
        Self {
            discovery_timeout: DISCOVERY_TIMEOUT,
            confirm_programs: true,
        }
    }
}

/// The collaborators shared by every session.
///
/// Optional capabilities are checked before use; a flow that needs a missing
/// one tells the user and gives up.
#[derive(Clone)]
pub struct Capabilities {
    pub schemas: Arc<dyn SchemaRegistry>,
    pub compiler: Arc<dyn ProgramCompiler>,
    pub user_context: Arc<dyn UserContext>,
    pub devices: Arc<dyn DeviceRegistry>,
    pub ids: Arc<dyn IdGenerator>,
    pub address_book: Option<Arc<dyn AddressBook>>,
    pub messaging: Option<Arc<dyn Messaging>>,
    pub discovery: Option<Arc<dyn Discovery>>,
    pub settings: DialogSettings,
}

impl Capabilities {
    /// Capabilities backed by `schemas`, validating programs with a
    /// [`SchemaCompiler`] over the same registry.
    pub fn new(schemas: Arc<dyn SchemaRegistry>) -> Self {
        Self {
            compiler: Arc::new(SchemaCompiler::new(schemas.clone())),
            schemas,
            user_context: Arc::new(InMemoryUserContext::new()),
            devices: Arc::new(InMemoryDevices::default()),
            ids: Arc::new(UuidIds),
            address_book: None,
            messaging: None,
            discovery: None,
            settings: DialogSettings::default(),
        }
    }

    pub fn with_compiler(mut self, compiler: Arc<dyn ProgramCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_user_context(mut self, user_context: Arc<dyn UserContext>) -> Self {
        self.user_context = user_context;
        self
    }

    pub fn with_devices(mut self, devices: Arc<dyn DeviceRegistry>) -> Self {
        self.devices = devices;
        self
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_address_book(mut self, address_book: Arc<dyn AddressBook>) -> Self {
        self.address_book = Some(address_book);
        self
    }

    pub fn with_messaging(mut self, messaging: Arc<dyn Messaging>) -> Self {
        self.messaging = Some(messaging);
        self
    }

    pub fn with_discovery(mut self, discovery: Arc<dyn Discovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn with_settings(mut self, settings: DialogSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// One step of a conversation: the capabilities, and where replies go.
pub struct Turn<'a> {
    pub caps: &'a Capabilities,
    replies: &'a mut Vec<Reply>,
}

impl<'a> Turn<'a> {
    pub fn new(caps: &'a Capabilities, replies: &'a mut Vec<Reply>) -> Self {
        Self { caps, replies }
    }

    /// Send a text message to the user.
    pub fn reply(&mut self, text: impl Into<String>) {
        self.replies.push(Reply::text(text));
    }

    pub fn push(&mut self, reply: Reply) {
        self.replies.push(reply);
    }
}
