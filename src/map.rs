//! Map and asset handling
//!
//! Maps are packed little-endian streams carrying a bank of RGBA textures
//! followed by a bank of models. Everything here reads from a plain
//! `io::Read`, so a map can come off a file, a network stream or an
//! in-memory fixture all the same.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};
use failure::{Error, ResultExt};
use nalgebra::{Matrix4, Rotation3, Vector2, Vector3, Vector4};

use clip::ClipPoint;
use interpolate::{linear_interpolate, Slope};
use mesh::{Mesh, Primitive};
use pixel::PixelRgba32;
use plane::Plane;

/// Load a texture from a stream object.
///
/// The data is expected to be laid out in the following way:
///
/// | Offset | Type          | Description                       |
/// |--------|---------------|-----------------------------------|
/// | 0      | u32           | Width of the texture, in pixels.  |
/// | 4      | u32           | Height of the texture, in pixels. |
/// | 8      | PixelRgba32[] | `width * height` packed pixels.   |
///
/// The pixels are copied into a new plane with the same extent.
pub fn load_texture_rgba32<R: Read>(data: &mut R) -> Result<Plane<PixelRgba32>, Error> {
    let width = data.read_u32::<LittleEndian>()
        .context("unexpected end of stream while reading texture dimensions")?;
    let height = data.read_u32::<LittleEndian>()
        .context("unexpected end of stream while reading texture dimensions")?;

    ensure!(width >= 1 && height >= 1, "texture with empty extent ({}, {})", width, height);

    debug!("> texture ({}, {})", width, height);

    let mut plane = Plane::new(width, height);
    for i in 0..height {
        for j in 0..width {
            let mut rgba = [0u8; 4];
            data.read_exact(&mut rgba)
                .context("unexpected end of stream while reading texture data into an rgba32 plane")?;

            *plane.at_mut(j, i)? = PixelRgba32::new(rgba[0], rgba[1], rgba[2], rgba[3]);
        }
    }

    Ok(plane)
}

/// Points that can be loaded from an input stream
pub trait LoadablePoint: Sized {
    fn next_from_stream<R: Read>(data: &mut R) -> Result<Self, Error>;
}

/// Point type used by the models loaded in from maps
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Index into the texture bank of the current map
    pub texture_index: u32,

    /// Texture coordinates in sampler space
    pub sampler: Vector2<f32>,

    /// Components of the color vector
    pub color: Vector3<f32>,

    /// Position of this point in model space
    pub position: Vector4<f32>,
}

impl LoadablePoint for Point {
    fn next_from_stream<R: Read>(data: &mut R) -> Result<Point, Error> {
        let mut fields = [0.0f32; 9];

        let texture_index = data.read_u32::<LittleEndian>()
            .context("unexpected end of stream while reading model point data")?;
        for field in fields.iter_mut() {
            *field = data.read_f32::<LittleEndian>()
                .context("unexpected end of stream while reading model point data")?;
        }

        Ok(Point {
            texture_index,
            sampler: Vector2::new(fields[0], fields[1]),
            color: Vector3::new(fields[2], fields[3], fields[4]),
            position: Vector4::new(fields[5], fields[6], fields[7], fields[8]),
        })
    }
}

impl ClipPoint for Point {
    fn position(&self) -> Vector4<f32> {
        self.position
    }
}

/// Slope between two points, interpolating everything but the texture
/// index, which rides along from the first endpoint.
#[derive(Debug, Clone)]
pub struct PointSlope {
    a: Point,
    b: Point,
}

impl PointSlope {
    pub fn new(a: Point, b: Point) -> PointSlope {
        PointSlope { a, b }
    }
}

impl Slope<Point> for PointSlope {
    fn at(&self, t: f64) -> Point {
        let t = t as f32;

        Point {
            texture_index: self.a.texture_index,
            sampler: linear_interpolate(t, self.a.sampler, self.b.sampler),
            color: linear_interpolate(t, self.a.color, self.b.color),
            position: linear_interpolate(t, self.a.position, self.b.position),
        }
    }
}

/// A model comprised of points and indices, along with a primitive
/// assembly mode and a world transformation.
///
/// Its functionality is very much the same as a [`Mesh`], the difference
/// being that a model owns its data, whereas a mesh is a set of
/// references to it.
///
/// [`Mesh`]: ../mesh/struct.Mesh.html
pub struct Model<P: LoadablePoint> {
    mode: u32,
    points: Vec<P>,
    indices: Vec<u32>,
    transform: Matrix4<f32>,
}

impl<P: LoadablePoint> Model<P> {
    /// Loads a model from a stream object.
    ///
    /// The data is expected to be laid out in the following way:
    ///
    /// | Offset | Type     | Description                              |
    /// |--------|----------|------------------------------------------|
    /// | 0      | u32      | Assembly mode: 0 = list, 1 = strip.      |
    /// | 4      | u32      | Number of points in the model.           |
    /// | 8      | u32      | Number of indices in the model.          |
    /// | 12     | f32 × 3  | World translation, x y z.                |
    /// | 24     | f32 × 3  | World scaling, x y z.                    |
    /// | 36     | f32 × 3  | World rotation, pitch yaw roll.          |
    /// | 48     | P[]      | Packed points.                           |
    /// | ..     | u32[]    | Packed indices.                          |
    pub fn load<R: Read>(data: &mut R) -> Result<Model<P>, Error> {
        let mode = data.read_u32::<LittleEndian>()
            .context("unexpected end of stream while reading model data")?;
        let point_count = data.read_u32::<LittleEndian>()
            .context("unexpected end of stream while reading model data")?;
        let index_count = data.read_u32::<LittleEndian>()
            .context("unexpected end of stream while reading model data")?;

        let mut fields = [0.0f32; 9];
        for field in fields.iter_mut() {
            *field = data.read_f32::<LittleEndian>()
                .context("unexpected end of stream while reading model data")?;
        }
        let [x, y, z, sx, sy, sz, pitch, yaw, roll] = fields;

        let mut transform = Matrix4::new_translation(&Vector3::new(x, y, z));
        transform *= Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz));
        transform *= Rotation3::from_axis_angle(&Vector3::x_axis(), pitch).to_homogeneous();
        transform *= Rotation3::from_axis_angle(&Vector3::y_axis(), yaw).to_homogeneous();
        transform *= Rotation3::from_axis_angle(&Vector3::z_axis(), roll).to_homogeneous();

        debug!("> model {}p {}i", point_count, index_count);

        let mut points = Vec::with_capacity(point_count as usize);
        for _ in 0..point_count {
            points.push(P::next_from_stream(data)?);
        }

        let mut indices = Vec::with_capacity(index_count as usize);
        for _ in 0..index_count {
            indices.push(data.read_u32::<LittleEndian>()
                .context("unexpected end of stream while reading model data")?);
        }

        Ok(Model { mode, points, indices, transform })
    }

    /// This model as a mesh borrowing its data. Fails when the assembly
    /// mode read from the stream matches no known primitive.
    pub fn mesh(&self) -> Result<Mesh<P>, Error> where P: Clone + Send + 'static {
        match self.mode {
            0 => Ok(Mesh::with_primitive(&self.points, &self.indices, Primitive::TriangleList)),
            1 => Ok(Mesh::with_primitive(&self.points, &self.indices, Primitive::TriangleStrip)),
            mode => bail!("invalid mesh mode {}", mode),
        }
    }

    /// Transformation matrix from model space to world space
    pub fn transformation(&self) -> Matrix4<f32> {
        self.transform
    }

    pub fn points(&self) -> &[P] {
        &self.points
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }
}

/// A map is a container for textures and models.
pub struct Map {
    textures: Vec<Plane<PixelRgba32>>,
    models: Vec<Model<Point>>,
}

impl Map {
    /// Loads a map from a stream object.
    ///
    /// The data is expected to be laid out in the following way:
    ///
    /// | Offset | Type      | Description                     |
    /// |--------|-----------|---------------------------------|
    /// | 0      | u32       | Number of textures in the map.  |
    /// | 4      | u32       | Number of models in the map.    |
    /// | 8      | Texture[] | Packed textures.                |
    /// | ..     | Model[]   | Packed models.                  |
    pub fn load<R: Read>(data: &mut R) -> Result<Map, Error> {
        let texture_count = data.read_u32::<LittleEndian>()
            .context("unexpected end of stream while reading map data")?;
        let model_count = data.read_u32::<LittleEndian>()
            .context("unexpected end of stream while reading map data")?;

        debug!("map contains {} textures, {} models", texture_count, model_count);

        let mut textures = Vec::with_capacity(texture_count as usize + 1);
        let mut models = Vec::with_capacity(model_count as usize);

        // Slot zero is the null texture, a single opaque black pixel, so
        // materials with no texture data still have something to sample.
        textures.push(Plane::new(1, 1));

        for _ in 0..texture_count {
            textures.push(load_texture_rgba32(data)?);
        }

        for _ in 0..model_count {
            models.push(Model::load(data)?);
        }

        Ok(Map { textures, models })
    }

    /// The texture at the given bank index; index zero is the null
    /// texture.
    pub fn texture(&self, index: u32) -> Option<&Plane<PixelRgba32>> {
        self.textures.get(index as usize)
    }

    pub fn textures(&self) -> &[Plane<PixelRgba32>] {
        &self.textures
    }

    pub fn models(&self) -> &[Model<Point>] {
        &self.models
    }
}
