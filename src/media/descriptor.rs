//! Transport-agnostic description of inbound media
//!
//! Messages can carry a file in one of four shapes. A single descriptor is
//! extracted at the transport boundary so the rest of the pipeline never
//! looks at raw transport payloads.

/// Extensions that mark a photo name as already image-typed.
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];

/// One inbound file, tagged by the attachment kind that carried it.
///
/// `name` is the transport-declared file name when one exists; photos never
/// declare one, so extraction synthesizes it via [`photo_name`]. `size` is
/// the declared size in bytes, 0 when the transport did not say; it is
/// advisory only and re-measured after ingestion. `file_id` is the handle
/// used to fetch the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaDescriptor {
    Document {
        name: Option<String>,
        size: u64,
        file_id: String,
    },
    Video {
        name: Option<String>,
        size: u64,
        file_id: String,
    },
    Audio {
        name: Option<String>,
        size: u64,
        file_id: String,
    },
    Photo {
        name: Option<String>,
        size: u64,
        file_id: String,
    },
}

impl MediaDescriptor {
    /// Declared file name, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Document { name, .. }
            | Self::Video { name, .. }
            | Self::Audio { name, .. }
            | Self::Photo { name, .. } => name.as_deref(),
        }
    }

    /// Declared size in bytes; 0 when unknown.
    pub fn declared_size(&self) -> u64 {
        match self {
            Self::Document { size, .. }
            | Self::Video { size, .. }
            | Self::Audio { size, .. }
            | Self::Photo { size, .. } => *size,
        }
    }

    /// Transport handle used to fetch the content.
    pub fn file_id(&self) -> &str {
        match self {
            Self::Document { file_id, .. }
            | Self::Video { file_id, .. }
            | Self::Audio { file_id, .. }
            | Self::Photo { file_id, .. } => file_id,
        }
    }

    /// Lowercase kind label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Document { .. } => "document",
            Self::Video { .. } => "video",
            Self::Audio { .. } => "audio",
            Self::Photo { .. } => "photo",
        }
    }

    /// Best human-readable name before sanitization.
    ///
    /// Photo names are guaranteed an image extension; anything without a
    /// declared name falls back to `file`.
    pub fn display_name(&self) -> String {
        match self {
            Self::Photo { name, .. } => match name {
                Some(n) => normalize_photo_name(n),
                None => "file".to_string(),
            },
            Self::Document { name, .. } | Self::Video { name, .. } | Self::Audio { name, .. } => {
                name.clone().unwrap_or_else(|| "file".to_string())
            }
        }
    }
}

/// Name synthesized for photos, which carry no declared name.
pub fn photo_name(message_id: i64) -> String {
    format!("photo_{message_id}.jpg")
}

/// Append `.jpg` to a photo name that lacks a recognized image extension.
pub fn normalize_photo_name(name: &str) -> String {
    let lower = name.to_lowercase();
    if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        name.to_string()
    } else {
        format!("{name}.jpg")
    }
}
