//! The triangle rasterizer and its programmable pipeline

use std::cmp;
use std::mem;
use std::sync::Arc;

use error::{RenderError, RenderResult};
use interpolate::Slope;
use pool::{make_task, Task, TaskHandle, ThreadPool};

/// Bounding-rectangle pixel area above which a dispatched triangle is
/// bisected before submission, so that no single worker ends up scanning
/// a screen-filling triangle on its own.
pub const BISECT_AREA_THRESHOLD: u64 = 1024 * 64;

/// Object and view transformation, applied to every point before
/// tessellation. Expected to behave as a pure function; it is invoked
/// concurrently with no synchronization.
pub type TransformFn<P> = Arc<dyn Fn(P) -> P + Send + Sync>;

/// Tessellation over one transformed triangle, typically clipping against
/// the near plane. Calls the emitter once per output triangle; zero, one
/// and two emissions are all valid.
pub type TessellateFn<P> = Arc<dyn Fn(P, P, P, &mut dyn FnMut(P, P, P) -> RenderResult<()>) -> RenderResult<()> + Send + Sync>;

/// Projection of a point from clip space into normalized device
/// coordinates, usually the perspective divide.
pub type ProjectFn<P> = Arc<dyn Fn(P) -> P + Send + Sync>;

/// Mapping of a projected point to its integer screen coordinates.
pub type ScreenFn<P> = Arc<dyn Fn(P) -> (i32, i32) + Send + Sync>;

/// Clip rectangle for fragments, as an inclusive
/// `(left, right, top, bottom)` tuple. Setting this avoids pixel work
/// that would land outside the drawing area.
pub type ScissorFn = Arc<dyn Fn() -> (u32, u32, u32, u32) + Send + Sync>;

/// Factory for a slope running from the first to the second point.
pub type SlopeFn<P, S> = Arc<dyn Fn(P, P) -> S + Send + Sync>;

/// The fragment shader, called once per covered pixel with the screen
/// coordinates and the interpolated point.
///
/// Invocations are concurrent across triangles, but it is guaranteed that
/// no two simultaneous invocations share the same X and Y, so the
/// coordinates can index per-pixel state directly.
pub type PainterFn<P> = Arc<dyn Fn(u32, u32, P) -> RenderResult<()> + Send + Sync>;

/// The future of one dispatched triangle: resolves once the triangle has
/// been fully painted, carrying any error its pipeline stages raised.
pub type RasterFuture = TaskHandle<RenderResult<()>>;

/// Triangle point bundle, the unit of rasterization work.
struct Triangle<P> {
    point0: P,
    point1: P,
    point2: P,
}

/// Fetches a pipeline stage, failing the surrounding function when the
/// host never installed it.
macro_rules! stage {
    ($stages:expr, $name:ident) => {
        match $stages.$name {
            Some(ref f) => &**f,
            None => return Err(RenderError::PipelineUnconfigured { stage: stringify!($name) }),
        }
    };
}

/// The installed pipeline stages, shared between the raster and every
/// in-flight task. Read-only once dispatching begins.
struct Stages<P, S> {
    transform: Option<TransformFn<P>>,
    tessellation: Option<TessellateFn<P>>,
    project: Option<ProjectFn<P>>,
    screen: Option<ScreenFn<P>>,
    scissor: Option<ScissorFn>,
    slope: Option<SlopeFn<P, S>>,
    painter: Option<PainterFn<P>>,
}

impl<P, S> Clone for Stages<P, S> {
    fn clone(&self) -> Stages<P, S> {
        Stages {
            transform: self.transform.clone(),
            tessellation: self.tessellation.clone(),
            project: self.project.clone(),
            screen: self.screen.clone(),
            scissor: self.scissor.clone(),
            slope: self.slope.clone(),
            painter: self.painter.clone(),
        }
    }
}

impl<P, S> Stages<P, S> where P: Clone + Send + 'static,
                              S: Slope<P> + 'static {
    fn empty() -> Stages<P, S> {
        Stages {
            transform: None,
            tessellation: None,
            project: None,
            screen: None,
            scissor: None,
            slope: None,
            painter: None,
        }
    }

    /// Approximate workload of a triangle: the pixel area of the
    /// axis-aligned bounding rectangle of its screen-space projection.
    fn darea(&self, t: &Triangle<P>) -> RenderResult<u64> {
        let screen = stage!(self, screen);

        let (x0, y0) = screen(t.point0.clone());
        let (x1, y1) = screen(t.point1.clone());
        let (x2, y2) = screen(t.point2.clone());

        let width = i64::from(cmp::max(x0, cmp::max(x1, x2))) - i64::from(cmp::min(x0, cmp::min(x1, x2)));
        let height = i64::from(cmp::max(y0, cmp::max(y1, y2))) - i64::from(cmp::min(y0, cmp::min(y1, y2)));

        Ok(width as u64 * height as u64)
    }

    /// Splits the `a`-`b` side at its midpoint, producing two triangles
    /// that share the new point. Returns the larger of the two child
    /// areas along with the children.
    fn split(&self, a: &P, b: &P, c: &P) -> RenderResult<(u64, Triangle<P>, Triangle<P>)> {
        let slope = stage!(self, slope);
        let middle = slope(a.clone(), b.clone()).at(0.5);

        let t0 = Triangle {
            point0: a.clone(),
            point1: middle.clone(),
            point2: c.clone(),
        };
        let t1 = Triangle {
            point0: middle,
            point1: b.clone(),
            point2: c.clone(),
        };

        let area = cmp::max(self.darea(&t0)?, self.darea(&t1)?);
        Ok((area, t0, t1))
    }

    /// Divides a triangle into two smaller triangles, trying the split on
    /// each of the three sides and keeping the one whose larger child is
    /// smallest.
    fn bisect(&self, source: &Triangle<P>) -> RenderResult<(Triangle<P>, Triangle<P>)> {
        let Triangle { ref point0, ref point1, ref point2 } = *source;

        let (mut best, mut t0, mut t1) = self.split(point0, point1, point2)?;

        let (area, s0, s1) = self.split(point1, point2, point0)?;
        if area < best {
            best = area;
            t0 = s0;
            t1 = s1;
        }

        let (area, s0, s1) = self.split(point2, point0, point1)?;
        if area < best {
            t0 = s0;
            t1 = s1;
        }

        Ok((t0, t1))
    }

    /// Sets up the rasterization of one triangle by transforming and
    /// tessellating it, scan converting whatever the tessellation emits.
    fn clip_rasterize(&self, triangle: Triangle<P>) -> RenderResult<()> {
        let transform = stage!(self, transform);

        let a = transform(triangle.point0);
        let b = transform(triangle.point1);
        let c = transform(triangle.point2);

        let tessellation = stage!(self, tessellation);
        tessellation(a, b, c, &mut |i, j, k| {
            self.rasterize(Triangle { point0: i, point1: j, point2: k })
        })
    }

    /// Actually perform the raster operation on the given triangle.
    fn rasterize(&self, triangle: Triangle<P>) -> RenderResult<()> {
        let project = stage!(self, project);
        let screen = stage!(self, screen);
        let scissor = stage!(self, scissor);
        let make_slope = stage!(self, slope);
        let painter = stage!(self, painter);

        let mut a = project(triangle.point0);
        let mut b = project(triangle.point1);
        let mut c = project(triangle.point2);

        let (mut x0, mut y0) = screen(a.clone());
        let (mut x1, mut y1) = screen(b.clone());
        let (mut x2, mut y2) = screen(c.clone());

        // Sort the points primarily by increasing Y and, secondly, by
        // increasing X.
        if (y0, x0) > (y1, x1) {
            mem::swap(&mut a, &mut b);
            mem::swap(&mut y0, &mut y1);
            mem::swap(&mut x0, &mut x1);
        }
        if (y1, x1) > (y2, x2) {
            mem::swap(&mut b, &mut c);
            mem::swap(&mut y1, &mut y2);
            mem::swap(&mut x1, &mut x2);
        }
        if (y0, x0) > (y1, x1) {
            mem::swap(&mut a, &mut b);
            mem::swap(&mut y0, &mut y1);
            mem::swap(&mut x0, &mut x1);
        }

        // Side of the shortest slope.
        let shortside = i64::from(y1 - y0) * i64::from(x2 - x0) < i64::from(x1 - x0) * i64::from(y2 - y0);
        let short = shortside as usize;
        let long = 1 - short;

        // The long slope runs the full height of the triangle; the short
        // one covers the upper half-range now and is replaced at the bend.
        let mut slopes = if shortside {
            [make_slope(a.clone(), c.clone()), make_slope(a.clone(), b.clone())]
        } else {
            [make_slope(a.clone(), b.clone()), make_slope(a.clone(), c.clone())]
        };

        let (left, right, top, bottom) = scissor();

        let mut ye = y1;
        let mut yt = y0;

        for y in cmp::max(y0, top as i32)..=cmp::min(y2, bottom as i32) {
            if y >= ye && ye != y2 {
                // End of the first bend; change the slopes.
                ye = y2;
                yt = y1;
                slopes[short] = make_slope(b.clone(), c.clone());
            }

            let pos_y = if y2 == y0 { 0.0 } else { f64::from(y - y0) / f64::from(y2 - y0) };
            let pos_r = if ye == yt { 0.0 } else { f64::from(y - yt) / f64::from(ye - yt) };

            let mut p0 = slopes[short].at(pos_r);
            let mut p1 = slopes[long].at(pos_y);

            let (mut x0, _) = screen(p0.clone());
            let (mut x1, _) = screen(p1.clone());
            if x0 > x1 {
                mem::swap(&mut x0, &mut x1);
                mem::swap(&mut p0, &mut p1);
            }

            let span = make_slope(p0, p1);
            for x in cmp::max(x0, left as i32)..=cmp::min(x1, right as i32) {
                let pos_x = if x1 == x0 { 0.0 } else { f64::from(x - x0) / f64::from(x1 - x0) };
                let point = span.at(pos_x);

                // Fragment coordinates must land inside the scissor; a
                // miss here is a scan conversion bug, not host error.
                if x < left as i32 || y < top as i32 || x > right as i32 || y > bottom as i32 {
                    return Err(RenderError::FragmentOutOfBounds { x, y });
                }

                painter(x as u32, y as u32, point)?;
            }
        }

        Ok(())
    }
}

/// A multi-stage, programmable triangle renderer.
///
/// The raster is parameterized over the point type `P` flowing through
/// the pipeline and the slope type `S` interpolating between two points.
/// The host installs the seven stage functions, then feeds triangles in
/// through [`dispatch`](#method.dispatch), usually via a
/// [`Mesh`](../mesh/struct.Mesh.html). Every stage may be invoked from
/// multiple pool workers at once and must not rely on external
/// synchronization.
pub struct Raster<P, S> {
    stages: Stages<P, S>,
    pool: ThreadPool,
}

impl<P, S> Raster<P, S> where P: Clone + Send + 'static,
                              S: Slope<P> + 'static {
    /// Creates a new raster with no stages installed, backed by a thread
    /// pool with one worker per hardware thread.
    pub fn new() -> Raster<P, S> {
        Raster::with_workers(ThreadPool::default_concurrency())
    }

    /// Creates a new raster backed by a pool of the given size.
    pub fn with_workers(workers: u32) -> Raster<P, S> {
        Raster {
            stages: Stages::empty(),
            pool: ThreadPool::new(workers),
        }
    }

    /// Install the object and view transformation stage.
    pub fn set_transform<F>(&mut self, f: F) where F: Fn(P) -> P + Send + Sync + 'static {
        self.stages.transform = Some(Arc::new(f));
    }

    /// Install the tessellation stage.
    pub fn set_tessellation<F>(&mut self, f: F) where F: Fn(P, P, P, &mut dyn FnMut(P, P, P) -> RenderResult<()>) -> RenderResult<()> + Send + Sync + 'static {
        self.stages.tessellation = Some(Arc::new(f));
    }

    /// Install the projection stage.
    pub fn set_project<F>(&mut self, f: F) where F: Fn(P) -> P + Send + Sync + 'static {
        self.stages.project = Some(Arc::new(f));
    }

    /// Install the screen mapping stage.
    pub fn set_screen<F>(&mut self, f: F) where F: Fn(P) -> (i32, i32) + Send + Sync + 'static {
        self.stages.screen = Some(Arc::new(f));
    }

    /// Install the scissor rectangle.
    pub fn set_scissor<F>(&mut self, f: F) where F: Fn() -> (u32, u32, u32, u32) + Send + Sync + 'static {
        self.stages.scissor = Some(Arc::new(f));
    }

    /// Install the slope factory.
    pub fn set_slope<F>(&mut self, f: F) where F: Fn(P, P) -> S + Send + Sync + 'static {
        self.stages.slope = Some(Arc::new(f));
    }

    /// Install the fragment shader.
    pub fn set_painter<F>(&mut self, f: F) where F: Fn(u32, u32, P) -> RenderResult<()> + Send + Sync + 'static {
        self.stages.painter = Some(Arc::new(f));
    }

    /// Dispatches the rendering of a triangle, given its three vertices.
    ///
    /// A triangle whose screen-space bounding rectangle covers more than
    /// [`BISECT_AREA_THRESHOLD`](constant.BISECT_AREA_THRESHOLD.html)
    /// pixels is recursively bisected first, so the pieces spread over
    /// the pool instead of pinning one worker. One future per submitted
    /// piece is appended to `futures`; each resolves when its piece has
    /// been fully painted.
    ///
    /// This function does not block on the rendering itself, though it
    /// runs the screen and slope stages inline while splitting.
    pub fn dispatch(&self, p0: P, p1: P, p2: P, futures: &mut Vec<RasterFuture>) -> RenderResult<()> {
        let triangle = Triangle { point0: p0, point1: p1, point2: p2 };

        let area = self.stages.darea(&triangle)?;
        if area > BISECT_AREA_THRESHOLD {
            let (t0, t1) = self.stages.bisect(&triangle)?;

            // A degenerate or sliver triangle can bisect into children no
            // smaller than itself; submitting oversized work beats
            // splitting forever.
            if self.stages.darea(&t0)? + self.stages.darea(&t1)? <= area {
                self.dispatch(t0.point0, t0.point1, t0.point2, futures)?;
                self.dispatch(t1.point0, t1.point1, t1.point2, futures)?;
                return Ok(());
            }
        }

        let stages = self.stages.clone();
        let task: Task<RenderResult<()>> = make_task(move || stages.clip_rasterize(triangle));

        futures.push(self.pool.submit_task(task, true));
        Ok(())
    }
}
