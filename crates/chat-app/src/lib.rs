pub mod chat;
pub mod command;
pub mod settings;
