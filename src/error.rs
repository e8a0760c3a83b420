//! Error handling structures

/// Helpful `Result` type alias
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that may occur during rendering or general usage of the library
#[derive(Debug, Clone, PartialEq, Fail)]
pub enum RenderError {
    /// An invalid coordinate was used to access a data point in a plane
    #[fail(display = "could not access data point at ({}, {}), expected < ({}, {})", x, y, width, height)]
    OutOfRange { x: u32, y: u32, width: u32, height: u32 },

    /// A raster pipeline stage was invoked without having been installed
    #[fail(display = "raster call missing {} function", stage)]
    PipelineUnconfigured { stage: &'static str },

    /// The scan converter produced a fragment coordinate outside the scissor
    #[fail(display = "invalid painter invocation coordinate ({}, {})", x, y)]
    FragmentOutOfBounds { x: i32, y: i32 },

    /// A mesh index referred past the end of its vertex data
    #[fail(display = "mesh index {} out of bounds for {} vertices", index, count)]
    MalformedMesh { index: u32, count: usize },

    /// A submitted task was abandoned before it could deliver its result
    #[fail(display = "task abandoned before completing")]
    TaskFailed,
}
