use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::llm::{ContentRequest, GeminiError, GenerativeBackend, ImageGenerationRequest, InlineImage};

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Images(ImageGenerationRequest),
    Content(ContentRequest),
}

/// In-memory provider that replays queued responses and records every call.
#[derive(Default)]
pub struct ScriptedBackend {
    images: Mutex<VecDeque<Result<Vec<InlineImage>, GeminiError>>>,
    contents: Mutex<HashMap<&'static str, VecDeque<Result<String, GeminiError>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_images(&self, response: Result<Vec<InlineImage>, GeminiError>) -> &Self {
        self.images.lock().push_back(response);
        self
    }

    pub fn push_content(&self, operation: &'static str, response: Result<String, GeminiError>) -> &Self {
        self.contents
            .lock()
            .entry(operation)
            .or_default()
            .push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn image_prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Images(request) => Some(request.prompt.clone()),
                RecordedCall::Content(_) => None,
            })
            .collect()
    }

    pub fn content_operations(&self) -> Vec<&'static str> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Content(request) => Some(request.operation),
                RecordedCall::Images(_) => None,
            })
            .collect()
    }
}

impl GenerativeBackend for ScriptedBackend {
    async fn generate_images(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<Vec<InlineImage>, GeminiError> {
        self.calls.lock().push(RecordedCall::Images(request.clone()));
        self.images
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(GeminiError::Transport("no scripted image response".to_string())))
    }

    async fn generate_content(&self, request: &ContentRequest) -> Result<String, GeminiError> {
        self.calls.lock().push(RecordedCall::Content(request.clone()));
        self.contents
            .lock()
            .get_mut(request.operation)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Err(GeminiError::Transport("no scripted content response".to_string())))
    }
}

pub fn sample_image() -> InlineImage {
    InlineImage::new("image/jpeg", "/9j/4AAQSkZJRg==")
}
