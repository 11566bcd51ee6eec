use tracing::info;

use crate::llm::{GeminiError, GenerativeBackend, ImageGenerationRequest, InlineImage};
use crate::studio::prompts::build_generation_prompt;
use crate::studio::request::TattooRequest;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("image generation is not configured: missing API key")]
    Unconfigured,
    #[error("Image generation failed, no images returned.")]
    NoImages,
    #[error(transparent)]
    Provider(GeminiError),
}

impl From<GeminiError> for GenerationError {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::Unconfigured => GenerationError::Unconfigured,
            other => GenerationError::Provider(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTattoo {
    pub prompt: String,
    pub image: InlineImage,
}

pub async fn generate_tattoo_image<B: GenerativeBackend>(
    backend: &B,
    request: &TattooRequest,
) -> Result<GeneratedTattoo, GenerationError> {
    let prompt = build_generation_prompt(request);
    info!("Generating image with prompt: {}", prompt);

    let images = backend
        .generate_images(&ImageGenerationRequest::single_square_jpeg(prompt.clone()))
        .await?;
    let image = images
        .into_iter()
        .next()
        .ok_or(GenerationError::NoImages)?;

    Ok(GeneratedTattoo { prompt, image })
}
