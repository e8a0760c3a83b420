//! Depth-tested framebuffer safe for concurrent fragment writes

use std::mem;
use std::slice;
use std::sync::Mutex;

use error::RenderResult;
use parallel::SharedCell;
use pixel::Pixel;
use plane::Plane;

/// Default depth value, equal to the farthest away anything can be.
///
/// Note that due to how floating point numbers work, depth values become
/// less precise the farther away the object is.
pub const DEFAULT_DEPTH_VALUE: f32 = ::std::f32::INFINITY;

/// A color plane, a depth plane and a grid of per-pixel locks, all of the
/// same extent and bound together for their whole lifetime.
///
/// Painters running on pool workers target the framebuffer through
/// [`plot`](#method.plot), which performs the whole
/// depth-compare-then-write sequence while holding that pixel's lock.
/// Pixels are independent, so two fragments only ever contend when they
/// land on the same coordinate, and a fragment that loses its depth test
/// leaves both planes untouched.
pub struct FrameBuffer<P: Pixel> {
    color: Plane<SharedCell<P>>,
    depth: Plane<SharedCell<f32>>,
    locks: Plane<Mutex<()>>,
}

impl<P: Pixel + Default> FrameBuffer<P> {
    /// Create a new framebuffer with the default pixel and every depth
    /// value at `DEFAULT_DEPTH_VALUE`.
    pub fn new(width: u32, height: u32) -> FrameBuffer<P> {
        FrameBuffer::with_pixel(width, height, Default::default())
    }
}

impl<P: Pixel> FrameBuffer<P> {
    /// Create a new framebuffer cleared to the given pixel.
    pub fn with_pixel(width: u32, height: u32, pixel: P) -> FrameBuffer<P> {
        FrameBuffer {
            color: Plane::from_fn(width, height, || SharedCell::new(pixel)),
            depth: Plane::from_fn(width, height, || SharedCell::new(DEFAULT_DEPTH_VALUE)),
            locks: Plane::from_fn(width, height, || Mutex::new(())),
        }
    }

    /// Get the width of the framebuffer in pixels
    #[inline(always)]
    pub fn width(&self) -> u32 { self.color.width() }

    /// Get the height of the framebuffer in pixels
    #[inline(always)]
    pub fn height(&self) -> u32 { self.color.height() }

    /// Resets every pixel to the given color and every depth value to
    /// `DEFAULT_DEPTH_VALUE`.
    pub fn clear(&mut self, pixel: P) {
        for cell in self.color.data_mut() {
            *cell.get_mut() = pixel;
        }
        for cell in self.depth.data_mut() {
            *cell.get_mut() = DEFAULT_DEPTH_VALUE;
        }
    }

    /// Submits one fragment: the stored depth at `(x, y)` is compared
    /// against `z`, and if the fragment is nearer, both the depth and the
    /// color are replaced. Returns whether the fragment won.
    ///
    /// The compare and both writes happen under the pixel's lock, so
    /// concurrent fragments at the same coordinate serialize and the
    /// nearest one ends up in both planes regardless of arrival order.
    pub fn plot(&self, x: u32, y: u32, z: f32, pixel: P) -> RenderResult<bool> {
        let _guard = self.locks.at(x, y)?.lock().unwrap();

        // Safety: bounds were checked by the lock lookup, and the lock
        // serializes every access to this pixel's cells.
        unsafe {
            let depth = self.depth.at_unchecked(x, y).get();
            if z >= *depth {
                return Ok(false);
            }

            *depth = z;
            *self.color.at_unchecked(x, y).get() = pixel;
        }

        Ok(true)
    }

    /// Reads the color at `(x, y)`. Takes the framebuffer exclusively, so
    /// it cannot race in-flight painters.
    pub fn pixel(&mut self, x: u32, y: u32) -> RenderResult<P> {
        Ok(*self.color.at_mut(x, y)?.get_mut())
    }

    /// Reads the depth at `(x, y)`.
    pub fn depth(&mut self, x: u32, y: u32) -> RenderResult<f32> {
        Ok(*self.depth.at_mut(x, y)?.get_mut())
    }

    /// The finished frame as raw bytes, row-major from the top-left
    /// pixel, ready to blit to a window surface.
    pub fn data(&mut self) -> &[u8] {
        let cells = self.color.data_mut();

        // Safety: SharedCell is repr(transparent) over its contents, so a
        // plane of cells has the exact layout of a plane of pixels, and
        // the exclusive borrow keeps writers out for the slice lifetime.
        unsafe {
            slice::from_raw_parts(cells.as_ptr() as *const u8,
                                  cells.len() * mem::size_of::<P>())
        }
    }
}
