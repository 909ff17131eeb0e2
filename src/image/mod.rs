//! Image editing module.

mod provider;
pub mod providers;
mod types;

pub use provider::ImageModel;
pub use types::{EffectRequest, EffectResponse, ImageFile, ImageFormat, ResponsePart};
