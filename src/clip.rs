//! Near-plane clipping for tessellation stages

use nalgebra::Vector4;
use smallvec::SmallVec;

use error::RenderResult;
use interpolate::Slope;

/// A point the clipper can reason about: anything exposing a homogeneous
/// position in clip space, as produced by the transform stage.
pub trait ClipPoint: Clone {
    fn position(&self) -> Vector4<f32>;
}

/// Check if the near plane has the given point inside of it
#[inline]
fn has_inside<P: ClipPoint>(point: &P) -> bool {
    point.position().z >= 0.0
}

/// Parameter along the `v1`-`v2` segment where it crosses the near plane
#[inline]
fn intersection<P: ClipPoint>(v1: &P, v2: &P) -> f64 {
    let a = v1.position().z;
    let b = v2.position().z;

    f64::from(a / (a - b))
}

/// Clips one triangle against the near plane, emitting the zero, one or
/// two triangles that remain in front of it.
///
/// This is the standard tessellation stage for a raster: install it with
/// the same slope factory the raster uses, so attributes at the cut
/// points interpolate the same way spans do. Points behind the plane are
/// replaced by points on it, and the surviving polygon (up to four
/// corners) is fanned back into triangles.
pub fn tessellate_near_plane<P, S, F>(slope: &F,
                                      a: P,
                                      b: P,
                                      c: P,
                                      emit: &mut dyn FnMut(P, P, P) -> RenderResult<()>) -> RenderResult<()>
    where P: ClipPoint,
          S: Slope<P>,
          F: Fn(P, P) -> S {
    let corners = [a, b, c];
    let mut polygon: SmallVec<[P; 4]> = SmallVec::new();

    for i in 0..3 {
        let current = &corners[i];
        let next = &corners[(i + 1) % 3];

        if has_inside(current) {
            polygon.push(current.clone());
        }

        if has_inside(current) != has_inside(next) {
            let t = intersection(current, next);
            polygon.push(slope(current.clone(), next.clone()).at(t));
        }
    }

    // The polygon has 0, 3 or 4 corners; fanning from the first covers
    // both non-empty shapes.
    for i in 1..polygon.len().saturating_sub(1) {
        emit(polygon[0].clone(), polygon[i].clone(), polygon[i + 1].clone())?;
    }

    Ok(())
}
