//! tokhost ABI crate: wire contracts shared by the host and sandboxed tokenizer modules.

pub mod chat;
pub mod entry;
pub mod token;

pub use chat::*;
pub use entry::*;
pub use token::*;
