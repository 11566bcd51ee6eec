use tracing::warn;

use crate::llm::{ContentRequest, GeminiError, GenerativeBackend, InlineImage};
use crate::studio::prompts::build_palette_prompt;
use crate::studio::schema::decode_hex_palette;
use crate::studio::NotConfigured;

pub const PALETTE_OPERATION: &str = "extract_palette";
pub const PALETTE_SIZE: usize = 5;

/// Dominant colors of `image` as `#RRGGBB`-style strings. Any provider or
/// shape failure yields an empty palette.
pub async fn extract_palette<B: GenerativeBackend>(
    backend: &B,
    image: &InlineImage,
) -> Result<Vec<String>, NotConfigured> {
    let request = ContentRequest::text(PALETTE_OPERATION, build_palette_prompt(PALETTE_SIZE))
        .with_image(image.clone())
        .with_string_array_schema();

    let text = match backend.generate_content(&request).await {
        Ok(text) => text,
        Err(GeminiError::Unconfigured) => return Err(NotConfigured),
        Err(err) => {
            warn!("Palette extraction failed: {}", err);
            return Ok(Vec::new());
        }
    };

    match decode_hex_palette(&text) {
        Ok(colors) => Ok(colors),
        Err(err) => {
            warn!("Palette extraction returned an unexpected shape: {}", err);
            Ok(Vec::new())
        }
    }
}
