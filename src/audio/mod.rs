//! Audio module for joining chunk audio and writing the result.

mod stitcher;
pub mod util;
mod wav;

pub use stitcher::{AudioTrack, PauseConfig, Stitcher};
pub use wav::write_wav;
