//! Color and transfer-function helpers used by the blitter and config

pub mod color;

pub use color::{decode_channel, encode_channel, linear_to_srgb, srgb_to_linear, Rgba};
