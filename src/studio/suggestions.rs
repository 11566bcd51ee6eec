use tracing::{debug, warn};

use crate::llm::{ContentRequest, GeminiError, GenerativeBackend};
use crate::studio::prompts::build_suggestion_prompt;
use crate::studio::schema::decode_string_array;
use crate::studio::NotConfigured;

pub const SUGGESTION_OPERATION: &str = "suggest_palettes";
pub const SUGGESTION_COUNT: usize = 4;
pub const MIN_STYLE_CHARS: usize = 3;

/// Palette-name chips for a style label. Labels shorter than
/// [`MIN_STYLE_CHARS`] never reach the provider.
pub async fn suggest_palettes<B: GenerativeBackend>(
    backend: &B,
    style: &str,
) -> Result<Vec<String>, NotConfigured> {
    let style = style.trim();
    if style.chars().count() < MIN_STYLE_CHARS {
        debug!("Skipping palette suggestions for short style label {:?}", style);
        return Ok(Vec::new());
    }

    let request = ContentRequest::text(
        SUGGESTION_OPERATION,
        build_suggestion_prompt(style, SUGGESTION_COUNT),
    )
    .with_string_array_schema();

    let text = match backend.generate_content(&request).await {
        Ok(text) => text,
        Err(GeminiError::Unconfigured) => return Err(NotConfigured),
        Err(err) => {
            warn!("Palette suggestions failed for style {:?}: {}", style, err);
            return Ok(Vec::new());
        }
    };

    match decode_string_array(&text) {
        Ok(suggestions) => Ok(suggestions
            .into_iter()
            .map(|suggestion| suggestion.trim().to_string())
            .filter(|suggestion| !suggestion.is_empty())
            .collect()),
        Err(err) => {
            warn!("Palette suggestions returned an unexpected shape: {}", err);
            Ok(Vec::new())
        }
    }
}
