//! Media intake pipeline
//!
//! Turns transport attachments into files on disk:
//!
//! - **MediaDescriptor**: tagged view of an inbound file (document, video,
//!   audio, photo) with declared name and size
//! - **ingest**: streaming write with a running size cap, idle-read
//!   timeout, throttled progress reports, and partial-file cleanup on every
//!   failure path
//!
//! # Example
//!
//! ```ignore
//! use linkdrop::media::{ingest, sanitize_file_name, storage_file_name, IngestConfig};
//!
//! let name = sanitize_file_name(media.display_name().as_str());
//! let dest = storage_dir.join(storage_file_name(message_id, &name));
//! let stored = ingest(stream, &dest, media.declared_size(), &config, |cur, total| {
//!     println!("{cur}/{total}");
//! })
//! .await?;
//! ```

pub mod descriptor;
pub mod ingest;

// Re-export commonly used types
pub use descriptor::{normalize_photo_name, photo_name, MediaDescriptor};
pub use ingest::{
    ingest, sanitize_file_name, storage_file_name, IngestConfig, IngestError, StoredFile,
};
