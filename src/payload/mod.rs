//! Payload module - decoded frame values and the variant table.
//!
//! Provides:
//! - [`Payload`] - capability trait every variant implements
//! - [`TextPayload`] - text variant (tag 2), body kept byte-exact
//! - [`PayloadRegistry`] - maps type tags to decoders
//!
//! # Example
//!
//! ```
//! use pingwire::payload::{Payload, PayloadRegistry, TextPayload};
//! use pingwire::protocol::payload_type;
//!
//! let registry = PayloadRegistry::standard();
//! let decoded = registry.decode(payload_type::TEXT, "ping".into()).unwrap();
//! assert_eq!(decoded.to_string(), "ping");
//! assert!(registry.decode(payload_type::BINARY, "ping".into()).is_err());
//! ```

mod registry;
mod text;

use std::any::Any;
use std::fmt;

use bytes::Bytes;

pub use registry::{DecodeFn, PayloadRegistry, PayloadRegistryBuilder};
pub use text::TextPayload;

/// A value carried by exactly one frame.
///
/// Implementations render to a display string, expose their body bytes and
/// report the tag written in front of them.
pub trait Payload: fmt::Display + fmt::Debug + Send + Sync + 'static {
    /// Type tag written as the first byte of the frame.
    fn payload_type(&self) -> u8;

    /// Body bytes, without header.
    fn bytes(&self) -> Bytes;

    /// Upcast for downcasting to the concrete variant.
    fn as_any(&self) -> &dyn Any;

    /// Owned upcast for downcasting to the concrete variant.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl dyn Payload {
    /// Borrow as a concrete variant.
    pub fn downcast_ref<T: Payload>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Convert into a concrete variant, or `None` if the type differs.
    pub fn downcast<T: Payload>(self: Box<Self>) -> Option<T> {
        self.into_any().downcast::<T>().ok().map(|b| *b)
    }
}
