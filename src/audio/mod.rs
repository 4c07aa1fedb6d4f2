// Audio module - placeholder asset decoding and binaural tone synthesis

pub mod asset;
pub mod tone;

pub use asset::AudioClip;
pub use tone::BinauralTone;
