//! Frame encoding

pub mod encoder;

pub use encoder::{EncoderStats, JpegFrameEncoder};
