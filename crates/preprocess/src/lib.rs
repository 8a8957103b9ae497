//! Letterbox preprocessing for square-input detection models.
//!
//! Takes a packed RGB8 image of any size and produces the `[1, 3, H, W]`
//! `f32` tensor a YOLO-style ONNX export expects, together with the
//! parameters needed to map model-space boxes back onto the source image.

pub mod letterbox;

use ndarray::{Array, IxDyn};

pub use letterbox::LetterboxPreProcessor;

/// Model input size used when nothing else is configured.
pub const DEFAULT_INPUT_SIZE: (u32, u32) = (640, 640);

/// Result of preprocessing including transformation parameters
#[derive(Debug)]
pub struct PreprocessResult {
    /// NCHW tensor, values in `[0, 1]`
    pub tensor: Array<f32, IxDyn>,
    pub transform: LetterboxTransform,
}

/// How a source image was placed inside the model input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxTransform {
    /// Scale factor applied during letterboxing
    pub scale: f32,
    /// X offset from letterboxing (in pixels)
    pub offset_x: f32,
    /// Y offset from letterboxing (in pixels)
    pub offset_y: f32,
    pub orig_width: u32,
    pub orig_height: u32,
}

impl LetterboxTransform {
    /// Map a point from model-input space back to source image pixels.
    #[inline]
    pub fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.offset_x) / self.scale,
            (y - self.offset_y) / self.scale,
        )
    }
}
