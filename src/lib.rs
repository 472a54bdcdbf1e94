//! A stylized real-time winter scene: a cel-shaded tree with classified
//! ornaments, gift boxes, falling snow, fireflies, and floating greeting
//! text, rendered through a pop-art post-process chain (posterize, halftone,
//! RGB shift, edge ink, bloom, vignette).
//!
//! The simulation modules are renderer-agnostic and fully testable without a
//! GPU; every shading and animation rule has a CPU reference here that the
//! WGSL in `render/shaders/` mirrors exactly. The [`render`] module owns the
//! wgpu plumbing and uploads the state assembled by [`app::App`].

pub mod app;
pub mod assets;
pub mod clock;
pub mod greeting;
pub mod material;
pub mod obj;
pub mod palette;
pub mod particles;
pub mod post;
pub mod render;
pub mod scene;
pub mod terrain;

pub use app::App;
pub use assets::{AssetBundle, AssetError};
pub use clock::{FrameClock, FrameTime};
pub use material::{classify, MaterialKind, MaterialVariant};
pub use obj::{load_obj_merged, load_obj_objects, MeshData, NamedMesh};
pub use palette::Palette;
pub use particles::{Fireflies, SnowField};
pub use post::PostChain;
pub use render::{CameraParams, Renderer};
pub use scene::{assemble_tree, gift_placements, Lifecycle, TreeScene};
