//! Telegram channel integration.
//!
//! Everything that talks to the Telegram Bot API lives here:
//!
//! - [`telegram`] - outbound API client (messages, file metadata, downloads)
//! - [`telegram_inbound`] - update payload parsing and event extraction
//! - [`telegram_receive`] - the long-polling receive loop
//!
//! The receive loop parses each update into an [`InboundMessage`] and hands
//! it to the gateway; replies and status edits go back out through
//! [`TelegramChannel`].

pub mod telegram;
pub mod telegram_inbound;
pub mod telegram_receive;

pub use telegram::{ChannelError, TelegramChannel, TELEGRAM_DEFAULT_API_BASE_URL};
pub use telegram_inbound::{
    extract_event, InboundEvent, InboundMessage, SenderInfo, TelegramUpdate,
};
pub use telegram_receive::telegram_receive_loop;
