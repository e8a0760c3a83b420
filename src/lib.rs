//! CPU triangle rasterizer with a programmable pipeline, built around a
//! worker pool so that fragment work spreads over every hardware thread.
//!
//! The heart of the crate is [`Raster`](raster/struct.Raster.html): the
//! host installs seven stage functions (transform, tessellation,
//! projection, screen mapping, scissor, slope factory and painter) and
//! then feeds it triangles, typically assembled from indexed vertex data
//! by a [`Mesh`](mesh/struct.Mesh.html). Oversized triangles are bisected
//! until they make reasonable work units, every piece renders as a pool
//! task, and concurrent fragment writes stay correct through the
//! per-pixel locks of the [`FrameBuffer`](framebuffer/struct.FrameBuffer.html).

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate byteorder;
extern crate nalgebra;
extern crate smallvec;

pub mod clip;
pub mod error;
pub mod framebuffer;
pub mod interpolate;
pub mod map;
pub mod mesh;
pub mod parallel;
pub mod pixel;
pub mod plane;
pub mod pool;
pub mod raster;
pub mod sampler;
pub mod utils;
