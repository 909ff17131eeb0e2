#![warn(missing_docs)]
//! Photocopy - age an image into a faded photocopy with Gemini.
//!
//! The crate sends a local image to a hosted image model together with a
//! fixed instruction and writes the edited image next to the original as
//! `<stem>_photocopy_effect.<ext>`.
//!
//! # Quick Start
//!
//! ```no_run
//! use photocopy::{EffectConfig, ImageEffectClient};
//!
//! #[tokio::main]
//! async fn main() -> photocopy::Result<()> {
//!     let config = EffectConfig::from_env()?;
//!     let client = ImageEffectClient::gemini(config)?;
//!     let output = client.apply_effect("cat.png").await?;
//!     println!("saved {}", output.display());
//!     Ok(())
//! }
//! ```
//!
//! # Testing with another model
//!
//! [`ImageEffectClient::new`] accepts any [`ImageModel`], so the network call
//! can be replaced by a test double.

mod client;
pub mod config;
mod error;
pub mod image;

pub use client::{output_path_for, ImageEffectClient, EFFECT_SUFFIX, PHOTOCOPY_PROMPT};
pub use config::EffectConfig;
pub use error::{EffectError, ErrorCategory, Result};
pub use crate::image::providers::{GeminiModel, GeminiProvider, GeminiProviderBuilder};
pub use crate::image::{EffectRequest, EffectResponse, ImageFile, ImageFormat, ImageModel, ResponsePart};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::client::ImageEffectClient;
    pub use crate::config::EffectConfig;
    pub use crate::error::{EffectError, Result};
    pub use crate::image::providers::GeminiProvider;
    pub use crate::image::{EffectRequest, EffectResponse, ImageModel};
}
