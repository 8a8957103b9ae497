use crate::error::DetectError;
use axum::body::Bytes;
use axum::extract::Multipart;

/// Multipart field the client is expected to put the image in.
pub const IMAGE_FIELD: &str = "image";

/// An uploaded image, still encoded.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Bytes,
    /// As declared by the client; never trusted for decoding
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

impl UploadedImage {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: None,
            file_name: None,
        }
    }

    /// Pull the image out of a multipart form.
    ///
    /// Takes the field named `image`. If the form has none, falls back to the
    /// first field that carries a filename.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, DetectError> {
        let mut fallback: Option<Self> = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| DetectError::Upload(format!("malformed multipart body: {e}")))?
        {
            let is_image_field = field.name() == Some(IMAGE_FIELD);
            if !is_image_field && (fallback.is_some() || field.file_name().is_none()) {
                continue;
            }

            let content_type = field.content_type().map(str::to_string);
            let file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| DetectError::Upload(format!("failed to read upload: {e}")))?;

            let upload = Self {
                bytes,
                content_type,
                file_name,
            };

            if is_image_field {
                return Ok(upload);
            }
            fallback = Some(upload);
        }

        fallback.ok_or_else(|| {
            DetectError::Upload(format!("no '{IMAGE_FIELD}' file field in the form"))
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
