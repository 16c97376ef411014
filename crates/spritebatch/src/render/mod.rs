//! Rendering backends and the frame loop.
//!
//! The batcher never talks to a GPU directly. It talks to a
//! [`RenderBackend`], which either records draws ([`RecordingBackend`]) or,
//! with the `gpu` feature, encodes them with wgpu ([`WgpuBackend`]).

mod backend;
mod frame;
#[cfg(feature = "gpu")]
mod gpu;
#[cfg(feature = "gpu")]
mod pipeline;

pub use backend::{DrawCall, RecordedDraw, RecordingBackend, RenderBackend, TextureHandle};
pub use frame::{Drawer, FrameDriver};
#[cfg(feature = "gpu")]
pub use gpu::WgpuBackend;
