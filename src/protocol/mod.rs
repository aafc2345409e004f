//! Protocol module - wire format, framing, and frame types.
//!
//! - 5-byte header encoding/decoding
//! - Frame buffer for accumulating partial reads
//! - Frame struct with typed accessors

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{build_frame, Frame};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{payload_type, FrameHeader, HEADER_SIZE, MAX_PAYLOAD_SIZE};
