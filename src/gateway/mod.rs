//! Message orchestration
//!
//! The gateway sits between the Telegram receive loop and the relay's
//! storage. Per media message it:
//!
//! 1. Replies with a status message that is edited in place from then on.
//! 2. Downloads the file from the Bot API and stores it locally.
//! 3. Registers a download link and optionally shortens it.
//! 4. Edits the final status message with name, size, link, and expiry.
//! 5. Sends an operator notification when a notify chat is configured.
//!
//! `/start` and `/help` get a plain welcome reply. Failures at any step are
//! reported back to the sender through the same status message; partial
//! files are already cleaned up by the ingestion pipeline.

pub mod progress;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::channels::{ChannelError, InboundEvent, InboundMessage, SenderInfo, TelegramChannel};
use crate::config::Config;
use crate::links::{LinkRegistry, RegistryError};
use crate::media::{
    ingest, sanitize_file_name, storage_file_name, IngestConfig, IngestError, MediaDescriptor,
};
use crate::shorten::Shortener;

use progress::{human_size, render_progress_bar};

/// Everything that can go wrong between a media message and its link.
#[derive(Debug, Error)]
enum ProcessError {
    #[error("channel: {0}")]
    Channel(#[from] ChannelError),
    #[error("ingest: {0}")]
    Ingest(#[from] IngestError),
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),
}

/// A stored file with its published link, ready to be announced.
struct PublishedFile {
    name: String,
    size_bytes: u64,
    link: String,
}

/// Orchestrates inbound messages end to end.
pub struct Gateway {
    channel: Arc<TelegramChannel>,
    registry: Arc<LinkRegistry>,
    shortener: Shortener,
    ingest_config: IngestConfig,
    config: Config,
}

impl Gateway {
    /// Assemble a gateway from its collaborators.
    pub fn new(
        channel: Arc<TelegramChannel>,
        registry: Arc<LinkRegistry>,
        shortener: Shortener,
        config: Config,
    ) -> Self {
        let ingest_config = IngestConfig::default()
            .with_max_file_size(config.max_file_size)
            .with_idle_timeout(config.idle_timeout);

        Self {
            channel,
            registry,
            shortener,
            ingest_config,
            config,
        }
    }

    /// Handle one parsed inbound message. Entry point for the receive loop.
    pub async fn handle_message(&self, inbound: InboundMessage) {
        let InboundMessage {
            chat_id,
            message_id,
            sender,
            event,
        } = inbound;

        match event {
            InboundEvent::Welcome => self.handle_welcome(chat_id).await,
            InboundEvent::Media(media) => {
                self.handle_media(chat_id, message_id, sender, media).await
            }
        }
    }

    async fn handle_welcome(&self, chat_id: i64) {
        debug!(chat_id, "welcome command received");
        if let Err(e) = self.channel.send_message(chat_id, &self.welcome_text()).await {
            warn!(chat_id, error = %e, "failed to send welcome message");
        }
    }

    async fn handle_media(
        &self,
        chat_id: i64,
        message_id: i64,
        sender: Option<SenderInfo>,
        media: MediaDescriptor,
    ) {
        info!(
            chat_id,
            message_id,
            kind = media.kind(),
            declared_size = media.declared_size(),
            "media message received"
        );

        // The status message is the anchor for all further feedback. If it
        // cannot be sent, the chat is unreachable and there is nothing to do.
        let status_id = match self.channel.send_message(chat_id, "⏳ Preparing...").await {
            Ok(id) => id,
            Err(e) => {
                warn!(chat_id, error = %e, "failed to send status message");
                return;
            }
        };

        match self.process_media(chat_id, message_id, status_id, &media).await {
            Ok(published) => {
                let text = self.success_text(&published);
                if let Err(e) = self.channel.edit_message_text(chat_id, status_id, &text).await {
                    warn!(chat_id, error = %e, "failed to edit final status message");
                }
                self.notify_operator(sender.as_ref(), &published).await;
            }
            Err(e) => {
                warn!(chat_id, message_id, error = %e, "failed to process media message");
                let text = failure_text(&e);
                if let Err(edit_err) =
                    self.channel.edit_message_text(chat_id, status_id, &text).await
                {
                    warn!(chat_id, error = %edit_err, "failed to report failure to sender");
                }
            }
        }
    }

    /// Download, store, register, shorten. Returns the published link.
    async fn process_media(
        &self,
        chat_id: i64,
        message_id: i64,
        status_id: i64,
        media: &MediaDescriptor,
    ) -> Result<PublishedFile, ProcessError> {
        let name = sanitize_file_name(&media.display_name());
        let dest = self
            .registry
            .storage_dir()
            .join(storage_file_name(message_id, &name));

        let file_path = self.channel.get_file(media.file_id()).await?;
        let response = self.channel.download_file(&file_path).await?;
        let stream = Box::pin(response.bytes_stream());

        // Edits are fire-and-forget; a failed edit never interrupts the
        // transfer. The call rate is already throttled by the ingest config.
        let channel = Arc::clone(&self.channel);
        let progress = move |current: u64, total: u64| {
            let text = format!(
                "⏬ Downloading...\n{}\n{} / {}",
                render_progress_bar(current, total),
                human_size(current),
                human_size(total),
            );
            let channel = Arc::clone(&channel);
            tokio::spawn(async move {
                if let Err(e) = channel.edit_message_text(chat_id, status_id, &text).await {
                    debug!(chat_id, error = %e, "progress edit failed");
                }
            });
        };

        let stored = ingest(
            stream,
            &dest,
            media.declared_size(),
            &self.ingest_config,
            progress,
        )
        .await?;

        let token = self
            .registry
            .register(message_id, &name, stored.path.clone(), stored.size_bytes)?;
        let link = self.shortener.shorten(&self.config.download_url(&token)).await;

        info!(
            chat_id,
            message_id,
            name = %name,
            size_bytes = stored.size_bytes,
            "file stored and link registered"
        );

        Ok(PublishedFile {
            name,
            size_bytes: stored.size_bytes,
            link,
        })
    }

    /// Send a summary to the configured notify chat. Failures are logged
    /// and never surfaced to the sender.
    async fn notify_operator(&self, sender: Option<&SenderInfo>, published: &PublishedFile) {
        let Some(notify_chat_id) = self.config.notify_chat_id else {
            return;
        };

        let text = notification_text(sender, published);
        if let Err(e) = self.channel.send_message(notify_chat_id, &text).await {
            warn!(notify_chat_id, error = %e, "failed to send operator notification");
        }
    }

    fn welcome_text(&self) -> String {
        format!(
            "👋 Send me a document, video, audio file or photo and I'll reply \
             with a download link.\n\nLinks stay valid for {} and files up to {} \
             are accepted.",
            describe_ttl(self.config.ttl),
            human_size(self.config.max_file_size),
        )
    }

    fn success_text(&self, published: &PublishedFile) -> String {
        format!(
            "✅ Upload completed!\n\n\
             📄 Name: {}\n\
             📦 Size: {}\n\
             🔗 Link: {}\n\n\
             ⏰ The link expires in {}.",
            published.name,
            human_size(published.size_bytes),
            published.link,
            describe_ttl(self.config.ttl),
        )
    }
}

/// Sender-facing text for a failed transfer. Size-cap violations name the
/// limit; everything else gets a generic notice.
fn failure_text(error: &ProcessError) -> String {
    match error {
        ProcessError::Ingest(IngestError::TooLarge { size, max }) => format!(
            "⚠️ This file is too large ({}). The limit is {}.",
            human_size(*size),
            human_size(*max),
        ),
        ProcessError::Ingest(IngestError::Stalled { .. }) => {
            "⚠️ The transfer stalled and was aborted. Please try again.".to_string()
        }
        _ => "⚠️ Failed to process the file. Please try again later.".to_string(),
    }
}

fn notification_text(sender: Option<&SenderInfo>, published: &PublishedFile) -> String {
    format!(
        "📥 New upload\n\n\
         👤 From: {}\n\
         📄 File: {} ({})\n\
         🔗 Link: {}\n\
         🕒 {}",
        describe_sender(sender),
        published.name,
        human_size(published.size_bytes),
        published.link,
        chrono::Utc::now().to_rfc3339(),
    )
}

fn describe_sender(sender: Option<&SenderInfo>) -> String {
    let Some(sender) = sender else {
        return "unknown sender".to_string();
    };

    let mut parts = Vec::new();
    if let Some(first_name) = &sender.first_name {
        parts.push(first_name.clone());
    }
    if let Some(username) = &sender.username {
        parts.push(format!("@{username}"));
    }

    if parts.is_empty() {
        format!("id {}", sender.id)
    } else {
        format!("{} (id {})", parts.join(" "), sender.id)
    }
}

/// Human wording for a TTL, rounded down to the largest whole unit.
fn describe_ttl(ttl: Duration) -> String {
    let secs = ttl.as_secs();
    if secs >= 3600 {
        let hours = secs / 3600;
        if hours == 1 {
            "1 hour".to_string()
        } else {
            format!("{hours} hours")
        }
    } else if secs >= 60 {
        let minutes = secs / 60;
        if minutes == 1 {
            "1 minute".to_string()
        } else {
            format!("{minutes} minutes")
        }
    } else {
        format!("{secs} seconds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::links::RegistryConfig;

    fn test_config() -> Config {
        Config {
            bot_token: "test-token".to_string(),
            base_url: "https://files.example.com".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            storage_dir: PathBuf::from("downloads"),
            ttl: Duration::from_secs(86_400),
            sweep_interval: Duration::from_secs(300),
            max_file_size: 52_428_800,
            idle_timeout: Duration::from_secs(30),
            shortener_url: None,
            notify_chat_id: None,
        }
    }

    fn test_gateway(dir: &tempfile::TempDir) -> Gateway {
        let registry_config =
            RegistryConfig::default().with_storage_dir(dir.path().to_path_buf());
        Gateway::new(
            Arc::new(TelegramChannel::new(
                "https://api.telegram.org".to_string(),
                "test-token".to_string(),
            )),
            Arc::new(LinkRegistry::new(registry_config).unwrap()),
            Shortener::new(None),
            test_config(),
        )
    }

    #[test]
    fn test_welcome_text_names_the_limits() {
        let dir = tempfile::TempDir::new().unwrap();
        let gateway = test_gateway(&dir);

        let text = gateway.welcome_text();
        assert!(text.contains("24 hours"));
        assert!(text.contains("50.0 MiB"));
    }

    #[test]
    fn test_success_text_contains_link_and_expiry() {
        let dir = tempfile::TempDir::new().unwrap();
        let gateway = test_gateway(&dir);

        let published = PublishedFile {
            name: "report.pdf".to_string(),
            size_bytes: 2048,
            link: "https://files.example.com/download/abc".to_string(),
        };
        let text = gateway.success_text(&published);
        assert!(text.contains("report.pdf"));
        assert!(text.contains("2.0 KiB"));
        assert!(text.contains("https://files.example.com/download/abc"));
        assert!(text.contains("expires in 24 hours"));
    }

    #[test]
    fn test_failure_text_too_large_names_the_cap() {
        let error = ProcessError::Ingest(IngestError::TooLarge {
            size: 60 * 1024 * 1024,
            max: 50 * 1024 * 1024,
        });
        let text = failure_text(&error);
        assert!(text.contains("60.0 MiB"));
        assert!(text.contains("50.0 MiB"));
    }

    #[test]
    fn test_failure_text_generic_for_channel_errors() {
        let error = ProcessError::Channel(ChannelError::Api("boom".to_string()));
        let text = failure_text(&error);
        assert!(text.contains("Failed to process"));
        assert!(!text.contains("boom"));
    }

    #[test]
    fn test_describe_sender_variants() {
        assert_eq!(describe_sender(None), "unknown sender");

        let full = SenderInfo {
            id: 456,
            first_name: Some("Ada".to_string()),
            username: Some("ada".to_string()),
        };
        assert_eq!(describe_sender(Some(&full)), "Ada @ada (id 456)");

        let bare = SenderInfo {
            id: 7,
            first_name: None,
            username: None,
        };
        assert_eq!(describe_sender(Some(&bare)), "id 7");
    }

    #[test]
    fn test_describe_ttl() {
        assert_eq!(describe_ttl(Duration::from_secs(86_400)), "24 hours");
        assert_eq!(describe_ttl(Duration::from_secs(3600)), "1 hour");
        assert_eq!(describe_ttl(Duration::from_secs(1800)), "30 minutes");
        assert_eq!(describe_ttl(Duration::from_secs(45)), "45 seconds");
    }
}
