pub mod detection;
pub mod encoding;
pub mod types;

pub use encoding::encode;
pub use types::{EncodedImagePart, ImagePayload};
