//! Ephemeral download-link registry
//!
//! Maps opaque, unguessable tokens to temporarily stored files and owns
//! their lifecycle:
//!
//! - **LinkRegistry**: concurrent token table with TTL-based expiry
//!   - 22-character URL-safe tokens from CSPRNG bytes
//!   - Collision-checked registration
//!   - Expired records are unresolvable even before the sweeper runs
//!   - Background sweeper deletes evicted records' backing files
//!
//! # Example
//!
//! ```ignore
//! use linkdrop::links::{LinkRegistry, RegistryConfig};
//!
//! let registry = LinkRegistry::new(RegistryConfig::default())?;
//! let token = registry.register(42, "report.pdf", path, 1024)?;
//!
//! if let Some(record) = registry.resolve(&token) {
//!     println!("serving {} ({} bytes)", record.display_name, record.size_bytes);
//! }
//! ```

pub mod registry;

// Re-export commonly used types
pub use registry::{LinkRecord, LinkRegistry, RegistryConfig, RegistryError};
