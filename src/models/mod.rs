//! Data models for CondoChat entities

mod contact;
mod conversation;
mod message;
mod user;

pub use contact::*;
pub use conversation::*;
pub use message::*;
pub use user::*;
