use tracing::{debug, warn};

use crate::llm::{ContentRequest, GeminiError, GenerativeBackend, InlineImage};
use crate::studio::prompts::{build_analysis_prompt, NEEDLE_ADVICE_FALLBACK};
use crate::studio::request::PartialTattooRequest;
use crate::studio::NotConfigured;

pub const ANALYSIS_OPERATION: &str = "analyze_needles";

/// Markdown needle advice for `image`. Provider failures are contained and
/// replaced by a fixed fallback sentence; only a missing credential escapes.
pub async fn analyze_needles<B: GenerativeBackend>(
    backend: &B,
    image: &InlineImage,
    details: &PartialTattooRequest,
) -> Result<String, NotConfigured> {
    debug!(
        "Requesting needle analysis (mime={}, with_details={})",
        image.mime_type,
        !details.is_empty()
    );
    let request = ContentRequest::text(ANALYSIS_OPERATION, build_analysis_prompt(details))
        .with_image(image.clone());

    match backend.generate_content(&request).await {
        Ok(advice) if !advice.trim().is_empty() => Ok(advice.trim().to_string()),
        Ok(_) => {
            warn!("Needle analysis returned no text, using fallback");
            Ok(NEEDLE_ADVICE_FALLBACK.to_string())
        }
        Err(GeminiError::Unconfigured) => Err(NotConfigured),
        Err(err) => {
            warn!("Needle analysis failed, using fallback: {}", err);
            Ok(NEEDLE_ADVICE_FALLBACK.to_string())
        }
    }
}
