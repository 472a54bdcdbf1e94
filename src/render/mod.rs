pub mod native;

pub use native::{CameraParams, Renderer};
