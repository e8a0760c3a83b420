//! Geometry meshes and primitive assembly

use std::fmt::{self, Debug};

use error::{RenderError, RenderResult};
use interpolate::Slope;
use raster::{Raster, RasterFuture};

/// Primitive input type used by a mesh to build triangles from index
/// data. The variants control how much input is consumed for every new
/// triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Every triplet of indices describes a new triangle
    TriangleList,
    /// Every three consecutive indices describe a new triangle
    TriangleStrip,
}

/// Geometry mesh draw command.
///
/// A mesh borrows a point buffer and an index buffer and assembles them
/// into the triangles that get submitted to a raster's dispatch function.
/// Winding is left untouched by the assembly; strips come out exactly as
/// indexed, with no alternation applied.
pub struct Mesh<'a, P: 'a> {
    vertices: &'a [P],
    indices: &'a [u32],
    primitive: Primitive,
}

impl<'a, P: 'a> Debug for Mesh<'a, P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Mesh ({:?}) {{ vertices: {}, indices: {} }}",
               self.primitive, self.vertices.len(), self.indices.len())
    }
}

impl<'a, P> Mesh<'a, P> where P: Clone + Send + 'static {
    /// Create a new mesh over the given vertex and index data, assembling
    /// triangle strips.
    pub fn new(vertices: &'a [P], indices: &'a [u32]) -> Mesh<'a, P> {
        Mesh::with_primitive(vertices, indices, Primitive::TriangleStrip)
    }

    /// Create a new mesh over the given vertex and index data with the
    /// given primitive assembly mode.
    pub fn with_primitive(vertices: &'a [P], indices: &'a [u32], primitive: Primitive) -> Mesh<'a, P> {
        Mesh { vertices, indices, primitive }
    }

    pub fn primitive(&self) -> Primitive {
        self.primitive
    }

    fn vertex(&self, index: u32) -> RenderResult<P> {
        match self.vertices.get(index as usize) {
            Some(vertex) => Ok(vertex.clone()),
            None => Err(RenderError::MalformedMesh {
                index,
                count: self.vertices.len(),
            }),
        }
    }

    /// Assembles the input in triangle list mode and dispatches the
    /// resulting triangles.
    fn dispatch_triangle_list<S>(&self, raster: &Raster<P, S>, futures: &mut Vec<RasterFuture>) -> RenderResult<()>
        where S: Slope<P> + 'static {
        if self.indices.len() % 3 != 0 {
            warn!("mesh in triangle list mode will have its trailing {} \
                   indices ignored for not having a multiple of 3",
                  self.indices.len() % 3);
        }
        if self.indices.len() / 3 == 0 {
            warn!("submitted mesh with no completable work");
            return Ok(());
        }

        let mut i = 0;
        while i + 2 < self.indices.len() {
            raster.dispatch(self.vertex(self.indices[i])?,
                            self.vertex(self.indices[i + 1])?,
                            self.vertex(self.indices[i + 2])?,
                            futures)?;
            i += 3;
        }

        Ok(())
    }

    /// Assembles the input in triangle strip mode and dispatches the
    /// resulting triangles.
    fn dispatch_triangle_strip<S>(&self, raster: &Raster<P, S>, futures: &mut Vec<RasterFuture>) -> RenderResult<()>
        where S: Slope<P> + 'static {
        if self.indices.len() < 3 {
            warn!("submitted mesh with no completable work");
            return Ok(());
        }

        for i in 0..self.indices.len() - 2 {
            raster.dispatch(self.vertex(self.indices[i])?,
                            self.vertex(self.indices[i + 1])?,
                            self.vertex(self.indices[i + 2])?,
                            futures)?;
        }

        Ok(())
    }

    /// Assemble the geometry in this mesh into triangles and dispatch
    /// them to the given raster, appending the futures of the operations
    /// to the given vector.
    ///
    /// This function does not block waiting for the render operations to
    /// complete. If that is what you want, use `draw()` instead.
    pub fn dispatch<S>(&self, raster: &Raster<P, S>, futures: &mut Vec<RasterFuture>) -> RenderResult<()>
        where S: Slope<P> + 'static {
        match self.primitive {
            Primitive::TriangleList => self.dispatch_triangle_list(raster, futures),
            Primitive::TriangleStrip => self.dispatch_triangle_strip(raster, futures),
        }
    }

    /// Assemble the geometry in this mesh into triangles, dispatch them
    /// to the given raster and block until every one has been drawn.
    ///
    /// All triangles are allowed to finish even when some fail; the first
    /// error observed while waiting is the one reported.
    pub fn draw<S>(&self, raster: &Raster<P, S>) -> RenderResult<()>
        where S: Slope<P> + 'static {
        let mut commands = Vec::new();
        self.dispatch(raster, &mut commands)?;

        let mut first_error = None;
        for command in commands {
            match command.get() {
                Ok(Ok(())) => {}
                Ok(Err(error)) | Err(error) => {
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
