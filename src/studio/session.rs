use tracing::{error, info, warn};

use crate::llm::{GenerativeBackend, InlineImage};
use crate::studio::analysis::analyze_needles;
use crate::studio::conversation::{BotReply, Conversation, Message, PendingTurn, TurnError};
use crate::studio::generation::{generate_tattoo_image, GenerationError};
use crate::studio::palette::extract_palette;
use crate::studio::prompts::{
    build_upload_summary, build_user_request_summary, ANALYSIS_REPLY, GENERATION_ERROR,
    GENERATION_REPLY, UNCONFIGURED_ERROR,
};
use crate::studio::request::{PartialTattooRequest, TattooRequest};
use crate::studio::suggestions;
use crate::studio::NotConfigured;
use crate::utils::timing::TurnTimer;

/// An image the user picked for analysis, with whatever they said about it.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub image: InlineImage,
    pub details: PartialTattooRequest,
}

pub struct Session<B> {
    backend: B,
    conversation: Conversation,
    banner: Option<String>,
    enrich_generations: bool,
}

fn palette_or_none(colors: Vec<String>) -> Option<Vec<String>> {
    (!colors.is_empty()).then_some(colors)
}

async fn generation_reply<B: GenerativeBackend>(
    backend: &B,
    request: &TattooRequest,
    enrich: bool,
) -> Result<BotReply, String> {
    let generated = match generate_tattoo_image(backend, request).await {
        Ok(generated) => generated,
        Err(GenerationError::Unconfigured) => {
            error!("Tattoo generation aborted: API key is not configured");
            return Err(UNCONFIGURED_ERROR.to_string());
        }
        Err(err) => {
            error!("Tattoo generation failed: {}", err);
            return Err(GENERATION_ERROR.to_string());
        }
    };

    let mut reply = BotReply {
        content: GENERATION_REPLY.to_string(),
        image_url: Some(generated.image.to_data_uri()),
        prompt: Some(generated.prompt),
        request: Some(request.clone()),
        ..BotReply::default()
    };

    if enrich {
        let details = request.to_partial();
        let (advice, palette) = tokio::join!(
            analyze_needles(backend, &generated.image, &details),
            extract_palette(backend, &generated.image),
        );
        reply.needle_recommendation = advice.ok();
        reply.color_palette = palette.ok().and_then(palette_or_none);
    }

    Ok(reply)
}

async fn analysis_reply<B: GenerativeBackend>(
    backend: &B,
    upload: &UploadedImage,
) -> Result<BotReply, String> {
    let (advice, palette) = tokio::join!(
        analyze_needles(backend, &upload.image, &upload.details),
        extract_palette(backend, &upload.image),
    );

    match (advice, palette) {
        (Ok(advice), Ok(colors)) => Ok(BotReply {
            content: ANALYSIS_REPLY.to_string(),
            image_url: Some(upload.image.to_data_uri()),
            needle_recommendation: Some(advice),
            color_palette: palette_or_none(colors),
            ..BotReply::default()
        }),
        _ => {
            error!("Image analysis aborted: API key is not configured");
            Err(UNCONFIGURED_ERROR.to_string())
        }
    }
}

impl<B: GenerativeBackend> Session<B> {
    pub fn new(backend: B, enrich_generations: bool) -> Self {
        Self {
            backend,
            conversation: Conversation::new(),
            banner: None,
            enrich_generations,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Transient error shown next to the form until the next turn starts.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.conversation.is_busy()
    }

    pub async fn submit_request(&mut self, request: TattooRequest) -> Result<&Message, TurnError> {
        let turn = self
            .conversation
            .begin_turn(build_user_request_summary(&request), None)?;
        self.banner = None;
        let mut timer = TurnTimer::start("generate", turn.placeholder_id());
        info!(
            "Turn {} started: generate subject={:?} style={:?}",
            turn.placeholder_id(),
            request.subject,
            request.style
        );

        let outcome = generation_reply(&self.backend, &request, self.enrich_generations).await;
        timer.complete(if outcome.is_ok() { "success" } else { "error" });
        Ok(self.settle(turn, outcome))
    }

    pub async fn analyze_upload(&mut self, upload: UploadedImage) -> Result<&Message, TurnError> {
        let turn = self.conversation.begin_turn(
            build_upload_summary(&upload.file_name),
            Some(upload.image.to_data_uri()),
        )?;
        self.banner = None;
        let mut timer = TurnTimer::start("analyze", turn.placeholder_id());
        info!(
            "Turn {} started: analyze file={:?} mime={}",
            turn.placeholder_id(),
            upload.file_name,
            upload.image.mime_type
        );

        let outcome = analysis_reply(&self.backend, &upload).await;
        timer.complete(if outcome.is_ok() { "success" } else { "error" });
        Ok(self.settle(turn, outcome))
    }

    pub async fn regenerate(&mut self, message_id: u64) -> Result<&Message, TurnError> {
        if self.is_busy() {
            return Err(TurnError::Busy);
        }
        let request = self.conversation.regenerable_request(message_id)?;
        info!("Regenerating tattoo from message {}", message_id);
        self.submit_request(request).await
    }

    pub async fn suggest_palettes(&self, style: &str) -> Result<Vec<String>, NotConfigured> {
        suggestions::suggest_palettes(&self.backend, style).await
    }

    fn settle(&mut self, turn: PendingTurn, outcome: Result<BotReply, String>) -> &Message {
        let reply = match outcome {
            Ok(reply) => reply,
            Err(message) => {
                warn!("Turn {} failed: {}", turn.placeholder_id(), message);
                self.banner = Some(message.clone());
                BotReply::text(message)
            }
        };
        self.conversation.settle(turn, reply)
    }
}

#[cfg(test)]
impl<B> Session<B> {
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GeminiError;
    use crate::studio::analysis::ANALYSIS_OPERATION;
    use crate::studio::conversation::Sender;
    use crate::studio::palette::PALETTE_OPERATION;
    use crate::studio::prompts::{NEEDLE_ADVICE_FALLBACK, WELCOME_MESSAGE};
    use crate::studio::request::{Complexity, TattooSize};
    use crate::studio::testing::{sample_image, RecordedCall, ScriptedBackend};

    fn lion_request() -> TattooRequest {
        TattooRequest {
            subject: "lion".to_string(),
            style: "Realistico".to_string(),
            size: TattooSize::Medium,
            color: "Bianco e nero".to_string(),
            placement: "Avambraccio".to_string(),
            elements: String::new(),
            complexity: Complexity::Moderate,
        }
    }

    fn upload() -> UploadedImage {
        UploadedImage {
            file_name: "schizzo.jpg".to_string(),
            image: sample_image(),
            details: PartialTattooRequest::default(),
        }
    }

    #[tokio::test]
    async fn full_generation_turn_fills_every_field() {
        let backend = ScriptedBackend::new();
        backend
            .push_images(Ok(vec![sample_image()]))
            .push_content(ANALYSIS_OPERATION, Ok("**Liner**: 5RL".to_string()))
            .push_content(PALETTE_OPERATION, Ok(r##"["#000000","#FFFFFF"]"##.to_string()));
        let mut session = Session::new(backend, true);

        let message = session.submit_request(lion_request()).await.unwrap().clone();

        assert_eq!(message.sender, Sender::Bot);
        assert_eq!(message.text(), Some(GENERATION_REPLY));
        assert_eq!(message.image_url, Some(sample_image().to_data_uri()));
        assert!(message.prompt.as_deref().unwrap().contains("lion"));
        assert_eq!(message.request, Some(lion_request()));
        assert_eq!(message.needle_recommendation.as_deref(), Some("**Liner**: 5RL"));
        assert_eq!(
            message.color_palette,
            Some(vec!["#000000".to_string(), "#FFFFFF".to_string()])
        );
        assert_eq!(session.conversation().len(), 3);
        assert!(!session.is_busy());
        assert!(session.banner().is_none());

        let prompts = session.backend().image_prompts();
        assert_eq!(prompts.len(), 1);
        let mut operations = session.backend().content_operations();
        operations.sort();
        assert_eq!(operations, vec![ANALYSIS_OPERATION, PALETTE_OPERATION]);
    }

    #[tokio::test]
    async fn enrichment_failures_do_not_abort_the_turn() {
        let backend = ScriptedBackend::new();
        backend
            .push_images(Ok(vec![sample_image()]))
            .push_content(
                ANALYSIS_OPERATION,
                Err(GeminiError::Transport("reset".to_string())),
            )
            .push_content(PALETTE_OPERATION, Ok(r##"["#ZZZZZZ", 5]"##.to_string()));
        let mut session = Session::new(backend, true);

        let message = session.submit_request(lion_request()).await.unwrap().clone();
        assert!(message.image_url.is_some());
        assert_eq!(
            message.needle_recommendation.as_deref(),
            Some(NEEDLE_ADVICE_FALLBACK)
        );
        assert_eq!(message.color_palette, None);
        assert!(session.banner().is_none());
    }

    #[tokio::test]
    async fn generation_only_when_enrichment_disabled() {
        let backend = ScriptedBackend::new();
        backend.push_images(Ok(vec![sample_image()]));
        let mut session = Session::new(backend, false);

        let message = session.submit_request(lion_request()).await.unwrap().clone();
        assert!(message.needle_recommendation.is_none());
        assert!(session.backend().content_operations().is_empty());
    }

    #[tokio::test]
    async fn generation_failure_becomes_error_message_and_banner() {
        let backend = ScriptedBackend::new();
        backend.push_images(Err(GeminiError::Status {
            status: 500,
            detail: "boom".to_string(),
        }));
        let mut session = Session::new(backend, true);

        let message = session.submit_request(lion_request()).await.unwrap().clone();
        assert_eq!(message.text(), Some(GENERATION_ERROR));
        assert!(message.image_url.is_none());
        assert!(message.request.is_none());
        assert_eq!(session.banner(), Some(GENERATION_ERROR));
        assert_eq!(session.conversation().len(), 3);
        assert!(session.backend().content_operations().is_empty());
    }

    #[tokio::test]
    async fn missing_credential_is_reported_in_the_turn() {
        let backend = ScriptedBackend::new();
        backend.push_images(Err(GeminiError::Unconfigured));
        let mut session = Session::new(backend, true);

        let message = session.submit_request(lion_request()).await.unwrap().clone();
        assert_eq!(message.text(), Some(UNCONFIGURED_ERROR));
        assert_eq!(session.banner(), Some(UNCONFIGURED_ERROR));
    }

    #[tokio::test]
    async fn next_turn_clears_the_banner() {
        let backend = ScriptedBackend::new();
        backend
            .push_images(Err(GeminiError::Transport("down".to_string())))
            .push_images(Ok(vec![sample_image()]));
        let mut session = Session::new(backend, false);

        session.submit_request(lion_request()).await.unwrap();
        assert!(session.banner().is_some());
        session.submit_request(lion_request()).await.unwrap();
        assert!(session.banner().is_none());
        assert_eq!(session.conversation().len(), 5);
    }

    #[tokio::test]
    async fn analysis_turn_has_no_request_snapshot() {
        let backend = ScriptedBackend::new();
        backend
            .push_content(ANALYSIS_OPERATION, Ok("**Shader**: 7RS".to_string()))
            .push_content(PALETTE_OPERATION, Ok(r##"["#112233"]"##.to_string()));
        let mut session = Session::new(backend, true);

        let message = session.analyze_upload(upload()).await.unwrap().clone();
        assert_eq!(message.text(), Some(ANALYSIS_REPLY));
        assert_eq!(message.image_url, Some(sample_image().to_data_uri()));
        assert!(message.request.is_none());
        assert!(message.prompt.is_none());
        assert_eq!(message.color_palette, Some(vec!["#112233".to_string()]));

        let user = &session.conversation().messages()[1];
        assert_eq!(user.sender, Sender::User);
        assert!(user.image_url.is_some());
        assert!(session.backend().image_prompts().is_empty());
    }

    #[tokio::test]
    async fn analysis_prompt_lists_only_the_details_given() {
        let backend = ScriptedBackend::new();
        backend
            .push_content(ANALYSIS_OPERATION, Ok("**Liner**: 3RL".to_string()))
            .push_content(PALETTE_OPERATION, Ok(r##"["#000000"]"##.to_string()));
        let mut session = Session::new(backend, true);
        let upload = UploadedImage {
            details: PartialTattooRequest {
                complexity: Some(Complexity::Intricate),
                ..PartialTattooRequest::default()
            },
            ..upload()
        };

        session.analyze_upload(upload).await.unwrap();

        let calls = session.backend().calls();
        let prompt = calls
            .iter()
            .find_map(|call| match call {
                RecordedCall::Content(request) if request.operation == ANALYSIS_OPERATION => {
                    Some(request.prompt.clone())
                }
                _ => None,
            })
            .unwrap();
        assert!(prompt.contains("- Complessità: Intricata"));
        for absent in ["- Soggetto:", "- Stile:", "- Dimensione:", "- Colori:", "- Posizione:"] {
            assert!(!prompt.contains(absent), "unexpected {absent} in {prompt}");
        }
    }

    #[tokio::test]
    async fn analysis_turn_degrades_on_provider_errors() {
        let backend = ScriptedBackend::new();
        let mut session = Session::new(backend, true);

        let message = session.analyze_upload(upload()).await.unwrap().clone();
        assert_eq!(message.text(), Some(ANALYSIS_REPLY));
        assert_eq!(
            message.needle_recommendation.as_deref(),
            Some(NEEDLE_ADVICE_FALLBACK)
        );
        assert!(message.color_palette.is_none());
        assert!(session.banner().is_none());
    }

    #[tokio::test]
    async fn analysis_turn_without_credential_fails() {
        let backend = ScriptedBackend::new();
        backend
            .push_content(ANALYSIS_OPERATION, Err(GeminiError::Unconfigured))
            .push_content(PALETTE_OPERATION, Err(GeminiError::Unconfigured));
        let mut session = Session::new(backend, true);

        let message = session.analyze_upload(upload()).await.unwrap().clone();
        assert_eq!(message.text(), Some(UNCONFIGURED_ERROR));
        assert_eq!(session.banner(), Some(UNCONFIGURED_ERROR));
    }

    #[tokio::test]
    async fn regenerate_reuses_the_stored_request() {
        let backend = ScriptedBackend::new();
        backend
            .push_images(Ok(vec![sample_image()]))
            .push_images(Ok(vec![sample_image()]));
        let mut session = Session::new(backend, false);

        let first_id = session.submit_request(lion_request()).await.unwrap().id;
        let second = session.regenerate(first_id).await.unwrap().clone();

        assert_eq!(second.request, Some(lion_request()));
        assert_ne!(second.id, first_id);
        let prompts = session.backend().image_prompts();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0], prompts[1]);
        assert_eq!(session.conversation().len(), 5);
    }

    #[tokio::test]
    async fn regenerate_rejects_messages_without_requests() {
        let mut session = Session::new(ScriptedBackend::new(), false);
        assert_eq!(
            session.conversation().messages()[0].text(),
            Some(WELCOME_MESSAGE)
        );
        assert_eq!(
            session.regenerate(1).await.unwrap_err(),
            TurnError::NotRegenerable(1)
        );
        assert_eq!(
            session.regenerate(99).await.unwrap_err(),
            TurnError::UnknownMessage(99)
        );
        assert_eq!(session.conversation().len(), 1);
        assert!(session.backend().calls().is_empty());
    }
}
