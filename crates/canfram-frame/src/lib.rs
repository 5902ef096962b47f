//! Frame codec and receiver for serial USB-CAN adapters.
//!
//! The adapter speaks two frame kinds over an otherwise unframed byte stream:
//! - Settings frames: fixed 20 bytes, `AA 55` markers, additive checksum
//! - Data frames: `AA`, a type byte carrying the payload length, a 16-bit id,
//!   0 to 8 payload bytes and a `55` terminator
//!
//! [`FrameParser`] decides frame boundaries one byte at a time and
//! [`FrameReceiver`] drives it against a [`canfram_transport::ByteChannel`].

pub mod cancel;
pub mod codec;
pub mod error;
pub mod frame;
pub mod parser;
pub mod receiver;

pub use cancel::CancelToken;
pub use codec::{
    checksum, decode_data, decode_hex, decode_settings, encode_data, encode_data_frame,
    encode_settings, BusMode, CanId, CanSpeed, DataFrame, IdFormat, SettingsFrame, DATA_OVERHEAD,
    MAX_PAYLOAD, SETTINGS_FRAME_LEN, SYNC,
};
pub use error::{EncodingError, FrameError, Result};
pub use frame::{Frame, FrameKind};
pub use parser::{is_frame_complete, FrameParser, ParseState, MAX_FRAME_LEN};
pub use receiver::{FrameReceiver, ReceiverConfig};
