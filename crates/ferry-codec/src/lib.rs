//! Decoders for the platform's auxiliary message payloads.
//!
//! - [`extension`]: tagged binary extension blobs (true sender inside groups).
//! - [`compressed`]: block-compressed message bodies.
//! - [`markup`]: escaped quoted-message XML: repair and field extraction.
//! - [`record`]: persisted message rows, built on the three above.

pub mod compressed;
pub mod error;
pub mod extension;
pub mod markup;
pub mod payload;
pub mod record;

pub use compressed::decode_compressed_content;
pub use error::CodecError;
pub use extension::{decode_extension, decode_sender_id, DecodedExtension, ExtensionValue};
pub use markup::{decode_quoted_message, parse_quoted_message, repair_markup, QuotedMessage};
pub use payload::Payload;
pub use record::{decode_stored_message, DecodedRow, StoredMessage};
