//! Config rows, generated assets and project settings
//!
//! Rows are what designers write, assets are what the reconciler produces.

mod asset;
mod config;
mod enums;
mod settings;
mod tags;

pub use asset::*;
pub use config::*;
pub use enums::*;
pub use settings::*;
pub use tags::*;
