//! Chat transports
//!
//! Each transport turns its inbound payload into `(user_id, text)`, feeds it to
//! [`crate::dialog::Dialog::handle`] and renders the returned replies. User ids
//! are prefixed with the transport name so sessions never collide.

/// Telegram long polling.
pub mod telegram;
/// HTTP webhook endpoints.
pub mod webhook;
