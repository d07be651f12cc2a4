pub mod media;
pub mod merkle;
pub mod perceptual;
