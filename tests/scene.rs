//! The whole pipeline at once: map-style points flowing through camera
//! transform, near-plane tessellation, perspective divide, screen mapping
//! and a texture-sampling painter into a depth-tested framebuffer.

extern crate nalgebra;
extern crate oatrender;

use std::sync::Arc;

use nalgebra::{Matrix4, Vector2, Vector3, Vector4};

use oatrender::clip::tessellate_near_plane;
use oatrender::error::RenderResult;
use oatrender::framebuffer::FrameBuffer;
use oatrender::map::{Point, PointSlope};
use oatrender::mesh::Mesh;
use oatrender::pixel::{PixelRgba32, PixelRgba32Slope};
use oatrender::plane::Plane;
use oatrender::raster::Raster;
use oatrender::sampler::Sampler;

const WIDTH: u32 = 8;
const HEIGHT: u32 = 8;

fn textured_point(x: f32, y: f32, z: f32, u: f32, v: f32) -> Point {
    Point {
        texture_index: 1,
        sampler: Vector2::new(u, v),
        color: Vector3::new(1.0, 1.0, 1.0),
        position: Vector4::new(x, y, z, 1.0),
    }
}

/// A raster configured the way the game configures its world renderer:
/// view matrix, near-plane clipping, perspective divide, NDC to pixels,
/// and a painter sampling the given texture into the framebuffer.
fn scene_raster(view: Matrix4<f32>,
                target: Arc<FrameBuffer<PixelRgba32>>,
                texture: Arc<Plane<PixelRgba32>>) -> Raster<Point, PointSlope> {
    let mut raster = Raster::with_workers(4);

    raster.set_transform(move |mut p: Point| {
        p.position = view * p.position;
        p
    });

    raster.set_tessellation(|a, b, c, emit: &mut dyn FnMut(Point, Point, Point) -> RenderResult<()>| {
        tessellate_near_plane(&PointSlope::new, a, b, c, emit)
    });

    raster.set_project(|mut p: Point| {
        // Perspective divide on x and y; z stays around as the depth the
        // painter feeds to the framebuffer.
        let w = p.position.w;
        p.position = Vector4::new(p.position.x / w, p.position.y / w, p.position.z, w);
        p
    });

    raster.set_screen(|p: Point| {
        let x = (p.position.x + 1.0) * WIDTH as f32 / 2.0;
        let y = (p.position.y + 1.0) * HEIGHT as f32 / 2.0;
        (x.round() as i32, y.round() as i32)
    });

    raster.set_scissor(|| (0, WIDTH - 1, 0, HEIGHT - 1));
    raster.set_slope(PointSlope::new);

    raster.set_painter(move |x, y, p: Point| {
        let sampler = Sampler::new(&texture, PixelRgba32Slope::new);
        let texel = sampler.at(f64::from(p.sampler.x), f64::from(p.sampler.y));
        target.plot(x, y, p.position.z, texel).map(|_| ())
    });

    raster
}

/// Two triangles spanning the NDC square as a strip, at the given depth.
fn ndc_quad(z: f32) -> [Point; 4] {
    [textured_point(-1.0, -1.0, z, 0.0, 0.0),
     textured_point(1.0, -1.0, z, 1.0, 0.0),
     textured_point(-1.0, 1.0, z, 0.0, 1.0),
     textured_point(1.0, 1.0, z, 1.0, 1.0)]
}

#[test]
fn textured_quad_fills_the_frame() {
    let target = Arc::new(FrameBuffer::new(WIDTH, HEIGHT));
    let texture = Arc::new(Plane::with_value(2, 2, PixelRgba32::new(255, 255, 0, 255)));

    let view = Matrix4::new_translation(&Vector3::new(0.0, 0.0, 2.0));
    let raster = scene_raster(view, target.clone(), texture);

    let vertices = ndc_quad(1.0);
    let indices = [0u32, 1, 2, 3];
    Mesh::new(&vertices, &indices).draw(&raster).unwrap();

    drop(raster);
    let mut framebuffer = match Arc::try_unwrap(target) {
        Ok(framebuffer) => framebuffer,
        Err(_) => panic!("framebuffer still shared after raster shutdown"),
    };

    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            assert_eq!(framebuffer.pixel(x, y).unwrap(), PixelRgba32::new(255, 255, 0, 255),
                       "pixel ({}, {}) missed the textured quad", x, y);
        }
    }
}

#[test]
fn geometry_behind_the_near_plane_is_clipped_out() {
    let target = Arc::new(FrameBuffer::new(WIDTH, HEIGHT));
    let texture = Arc::new(Plane::with_value(1, 1, PixelRgba32::new(255, 0, 0, 255)));

    // The camera sits past the quad, leaving every vertex behind the near
    // plane after the view transform.
    let view = Matrix4::new_translation(&Vector3::new(0.0, 0.0, -4.0));
    let raster = scene_raster(view, target.clone(), texture);

    let vertices = ndc_quad(1.0);
    let indices = [0u32, 1, 2, 3];
    Mesh::new(&vertices, &indices).draw(&raster).unwrap();

    drop(raster);
    let mut framebuffer = match Arc::try_unwrap(target) {
        Ok(framebuffer) => framebuffer,
        Err(_) => panic!("framebuffer still shared after raster shutdown"),
    };

    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            assert_eq!(framebuffer.pixel(x, y).unwrap(), PixelRgba32::default());
        }
    }
}

#[test]
fn partially_clipped_geometry_still_renders_its_visible_half() {
    let target = Arc::new(FrameBuffer::new(WIDTH, HEIGHT));
    let texture = Arc::new(Plane::with_value(1, 1, PixelRgba32::new(0, 255, 255, 255)));

    let raster = scene_raster(Matrix4::identity(), target.clone(), texture);

    // One corner pokes behind the near plane; the tessellation has to cut
    // the triangle and keep the front piece.
    let vertices = [textured_point(-1.0, -1.0, -1.0, 0.0, 0.0),
                    textured_point(1.0, -1.0, 1.0, 1.0, 0.0),
                    textured_point(-1.0, 1.0, 1.0, 0.0, 1.0)];
    let indices = [0u32, 1, 2];
    Mesh::new(&vertices, &indices).draw(&raster).unwrap();

    drop(raster);
    let mut framebuffer = match Arc::try_unwrap(target) {
        Ok(framebuffer) => framebuffer,
        Err(_) => panic!("framebuffer still shared after raster shutdown"),
    };

    // The surviving piece still covers the far corners of its edge.
    assert_eq!(framebuffer.pixel(7, 0).unwrap(), PixelRgba32::new(0, 255, 255, 255));
    assert_eq!(framebuffer.pixel(0, 7).unwrap(), PixelRgba32::new(0, 255, 255, 255));

    let mut painted = 0;
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            if framebuffer.pixel(x, y).unwrap() != PixelRgba32::default() {
                painted += 1;
            }
        }
    }
    assert!(painted > 0 && painted < (WIDTH * HEIGHT) as i32,
            "expected a partially covered frame, got {} painted pixels", painted);
}
