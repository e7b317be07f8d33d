pub mod chat;
pub mod generate;
pub mod onboard;
pub mod status;
