pub mod gemini;
pub mod media;

use serde_json::{json, Value};

pub use gemini::{GeminiClient, GeminiError};
pub use media::InlineImage;

#[derive(Debug, Clone, PartialEq)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub number_of_images: u32,
    pub output_mime_type: String,
    pub aspect_ratio: String,
}

impl ImageGenerationRequest {
    /// One square JPEG.
    pub fn single_square_jpeg(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            number_of_images: 1,
            output_mime_type: "image/jpeg".to_string(),
            aspect_ratio: "1:1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentRequest {
    pub operation: &'static str,
    pub prompt: String,
    pub image: Option<InlineImage>,
    pub response_schema: Option<Value>,
}

impl ContentRequest {
    pub fn text(operation: &'static str, prompt: impl Into<String>) -> Self {
        Self {
            operation,
            prompt: prompt.into(),
            image: None,
            response_schema: None,
        }
    }

    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_string_array_schema(mut self) -> Self {
        self.response_schema = Some(string_array_schema());
        self
    }
}

pub fn string_array_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": { "type": "STRING" }
    })
}

/// Seam between the studio clients and the generative provider.
#[allow(async_fn_in_trait)]
pub trait GenerativeBackend {
    async fn generate_images(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<Vec<InlineImage>, GeminiError>;

    async fn generate_content(&self, request: &ContentRequest) -> Result<String, GeminiError>;
}
