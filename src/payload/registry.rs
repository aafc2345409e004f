//! Payload registry for dispatching frame bodies by type tag.
//!
//! The registry is a fixed 256-slot table built once through
//! [`PayloadRegistryBuilder`] and never mutated afterwards. Share it behind
//! an `Arc`.
//!
//! # Example
//!
//! ```
//! use pingwire::payload::{PayloadRegistry, TextPayload};
//! use pingwire::protocol::payload_type;
//!
//! let registry = PayloadRegistry::builder()
//!     .register(payload_type::TEXT, "text", |body| {
//!         Ok(Box::new(TextPayload::from_body(body)))
//!     })
//!     .build();
//!
//! assert!(registry.contains(payload_type::TEXT));
//! assert_eq!(registry.name(payload_type::TEXT), Some("text"));
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use bytes::Bytes;

use super::{Payload, TextPayload};
use crate::error::{Result, WireError};
use crate::protocol::payload_type;

/// Constructor turning a frame body into a payload variant.
pub type DecodeFn = fn(Bytes) -> Result<Box<dyn Payload>>;

#[derive(Clone, Copy)]
struct Entry {
    name: &'static str,
    decode: DecodeFn,
}

/// Read-only table mapping type tags to payload decoders.
pub struct PayloadRegistry {
    entries: [Option<Entry>; 256],
}

impl PayloadRegistry {
    /// Start building a registry with no variants.
    pub fn builder() -> PayloadRegistryBuilder {
        PayloadRegistryBuilder::new()
    }

    /// The process-wide standard registry (text payloads only).
    pub fn standard() -> Arc<PayloadRegistry> {
        static STANDARD: OnceLock<Arc<PayloadRegistry>> = OnceLock::new();
        STANDARD
            .get_or_init(|| Arc::new(PayloadRegistryBuilder::standard().build()))
            .clone()
    }

    /// Check whether a tag has a registered decoder.
    #[inline]
    pub fn contains(&self, tag: u8) -> bool {
        self.entries[tag as usize].is_some()
    }

    /// Get the variant name registered for a tag.
    pub fn name(&self, tag: u8) -> Option<&'static str> {
        self.entries[tag as usize].map(|e| e.name)
    }

    /// Iterate over registered tags in ascending order.
    pub fn tags(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=u8::MAX).filter(|&tag| self.contains(tag))
    }

    /// Decode a body with the decoder registered for `tag`.
    ///
    /// Unregistered tags fail with `UnknownPayloadType`.
    pub fn decode(&self, tag: u8, body: Bytes) -> Result<Box<dyn Payload>> {
        let entry = self.entries[tag as usize].ok_or(WireError::UnknownPayloadType(tag))?;
        (entry.decode)(body)
    }
}

impl fmt::Debug for PayloadRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.tags()
                    .filter_map(|tag| self.name(tag).map(|name| (tag, name))),
            )
            .finish()
    }
}

/// Builder for [`PayloadRegistry`].
pub struct PayloadRegistryBuilder {
    entries: [Option<Entry>; 256],
}

impl PayloadRegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            entries: [None; 256],
        }
    }

    /// Create a builder with the standard variants registered.
    pub fn standard() -> Self {
        Self::new().register(payload_type::TEXT, "text", TextPayload::decode_boxed)
    }

    /// Register a decoder for `tag`.
    ///
    /// Registering a tag twice keeps the last decoder.
    pub fn register(mut self, tag: u8, name: &'static str, decode: DecodeFn) -> Self {
        if self.entries[tag as usize].is_some() {
            tracing::warn!("Replacing payload decoder for tag {}", tag);
        }
        self.entries[tag as usize] = Some(Entry { name, decode });
        self
    }

    /// Freeze the table.
    pub fn build(self) -> PayloadRegistry {
        PayloadRegistry {
            entries: self.entries,
        }
    }
}

impl Default for PayloadRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
