mod guestbook_service;
pub mod moderation;
pub mod thread;

pub use guestbook_service::*;
pub use moderation::{AdminGate, ModerationPolicy, ReviewAction};
