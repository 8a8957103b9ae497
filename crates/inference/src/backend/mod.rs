use ndarray::{Array, IxDyn};

#[cfg(feature = "ort-backend")]
pub mod ort;

pub trait InferenceBackend {
    /// Run inference on a `[1, 3, H, W]` letterboxed batch.
    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput>;

    /// Class names shipped inside the model file, in the exporter's raw
    /// `{index: 'name'}` form, if the format carries them.
    fn embedded_class_names(&self) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

pub struct InferenceOutput {
    /// `[1, 4 + num_classes, anchors]` (or transposed): cxcywh in input
    /// pixels followed by per-class scores
    pub predictions: ndarray::ArrayD<f32>,
}
