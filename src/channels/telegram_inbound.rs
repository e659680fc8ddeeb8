//! Telegram inbound update parsing.
//!
//! Serde views of the update payloads the relay cares about, and the
//! extraction that turns one into an [`InboundMessage`] for the gateway.
//! Every optional field defaults so unexpected payload shapes parse rather
//! than fail.

use serde::Deserialize;

use crate::media::{photo_name, MediaDescriptor};

/// Telegram update payload.
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    #[serde(default)]
    pub update_id: Option<i64>,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

/// Telegram message payload.
#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    #[serde(default)]
    pub message_id: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    pub chat: TelegramChat,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    #[serde(default)]
    pub document: Option<TelegramDocument>,
    #[serde(default)]
    pub video: Option<TelegramVideo>,
    #[serde(default)]
    pub audio: Option<TelegramAudio>,
    #[serde(default)]
    pub photo: Option<Vec<TelegramPhotoSize>>,
}

/// Telegram chat metadata.
#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(default, rename = "type")]
    pub chat_type: Option<String>,
}

/// Telegram user metadata.
#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Document attachment.
#[derive(Debug, Deserialize)]
pub struct TelegramDocument {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// Video attachment.
#[derive(Debug, Deserialize)]
pub struct TelegramVideo {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// Audio attachment.
#[derive(Debug, Deserialize)]
pub struct TelegramAudio {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// One entry of a photo's size array. Telegram sends sizes ascending; the
/// last entry is the full-resolution one.
#[derive(Debug, Deserialize)]
pub struct TelegramPhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// Sender details carried into operator notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderInfo {
    pub id: i64,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

/// What an inbound message asks of the relay.
#[derive(Debug, PartialEq, Eq)]
pub enum InboundEvent {
    /// A file to ingest and publish.
    Media(MediaDescriptor),
    /// A `/start` or `/help` command.
    Welcome,
}

/// Parsed inbound message.
#[derive(Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub message_id: i64,
    pub sender: Option<SenderInfo>,
    pub event: InboundEvent,
}

/// Extract the relay-relevant event from an update.
///
/// Returns `None` for non-message updates, bot senders, and messages that
/// carry neither a file nor a recognized command.
pub fn extract_event(update: &TelegramUpdate) -> Option<InboundMessage> {
    let message = update.message.as_ref()?;

    if let Some(from) = message.from.as_ref() {
        if from.is_bot {
            return None;
        }
    }

    let event = if let Some(media) = extract_media(message) {
        InboundEvent::Media(media)
    } else if is_welcome_command(message.text.as_deref()) {
        InboundEvent::Welcome
    } else {
        return None;
    };

    let sender = message.from.as_ref().map(|u| SenderInfo {
        id: u.id,
        first_name: u.first_name.clone(),
        username: u.username.clone(),
    });

    Some(InboundMessage {
        chat_id: message.chat.id,
        message_id: message.message_id,
        sender,
        event,
    })
}

/// Map a message's attachment to a media descriptor.
///
/// Checks document, then video, then audio, then photo. Photos use the
/// last (largest) size entry and a synthesized name.
pub fn extract_media(message: &TelegramMessage) -> Option<MediaDescriptor> {
    if let Some(document) = &message.document {
        return Some(MediaDescriptor::Document {
            name: document.file_name.clone(),
            size: document.file_size.unwrap_or(0),
            file_id: document.file_id.clone(),
        });
    }
    if let Some(video) = &message.video {
        return Some(MediaDescriptor::Video {
            name: video.file_name.clone(),
            size: video.file_size.unwrap_or(0),
            file_id: video.file_id.clone(),
        });
    }
    if let Some(audio) = &message.audio {
        return Some(MediaDescriptor::Audio {
            name: audio.file_name.clone(),
            size: audio.file_size.unwrap_or(0),
            file_id: audio.file_id.clone(),
        });
    }
    if let Some(sizes) = &message.photo {
        let largest = sizes.last()?;
        return Some(MediaDescriptor::Photo {
            name: Some(photo_name(message.message_id)),
            size: largest.file_size.unwrap_or(0),
            file_id: largest.file_id.clone(),
        });
    }
    None
}

/// Whether text is a `/start` or `/help` command, with or without a
/// `@botname` suffix or trailing payload.
pub fn is_welcome_command(text: Option<&str>) -> bool {
    let Some(text) = text else {
        return false;
    };
    let first = text.trim().split_whitespace().next().unwrap_or("");
    let command = first.split('@').next().unwrap_or("");
    matches!(command, "/start" | "/help")
}
