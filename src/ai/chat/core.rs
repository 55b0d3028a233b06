use handlebars::Handlebars;
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use super::models::{IMAGE_CAPTION, Message, Notice, Transcript};
use crate::ai::prompt;
use crate::core::{AppConfig, DEFAULT_GREETING};
use crate::gemini::{Gateway, GatewayError};
use crate::media::{CompressionSettings, ImagePayload, MediaError, MediaSource};

/// What kind of request a turn sends to the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnKind {
    Text,
    Image,
}

#[derive(Debug)]
enum TurnRequest {
    Text { prompt: String },
    Image { payload: ImagePayload },
}

/// A turn that has been started but not yet resolved. It can't be
/// cloned and `SessionController::complete` consumes it so each turn
/// is reduced into the session exactly once.
///
/// The session stays busy until the turn is passed to `complete` or
/// `run_turn`, dropping it leaves the session busy for good.
#[derive(Debug)]
#[must_use = "a started turn keeps the session busy until it is completed"]
pub struct PendingTurn {
    id: u64,
    request: TurnRequest,
}

impl PendingTurn {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> TurnKind {
        match self.request {
            TurnRequest::Text { .. } => TurnKind::Text,
            TurnRequest::Image { .. } => TurnKind::Image,
        }
    }
}

/// The single, mutable state of a chat session. Only the controller
/// changes it.
#[derive(Debug)]
pub struct SessionState {
    session_id: Uuid,
    transcript: Transcript,
    // Set while a request is in flight, this is the busy flag
    in_flight: Option<u64>,
    draft_text: String,
    pending_attachment: Option<ImagePayload>,
    notice: Option<Notice>,
}

impl SessionState {
    fn new(greeting: &str) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            transcript: Transcript::seeded(greeting),
            in_flight: None,
            draft_text: String::new(),
            pending_attachment: None,
            notice: None,
        }
    }
}

/// A copy of everything a renderer needs to draw the session.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub transcript: Vec<Message>,
    pub busy: bool,
    pub notice: Option<Notice>,
}

/// Owns a chat session and turns user intents into requests to the
/// gateway, folding the results back into the transcript.
///
/// There is at most one request in flight. Intents that arrive while
/// busy are ignored. Every turn can be driven in one call with
/// `on_submit_text` or `on_request_image_pick`, or in phases (start,
/// `dispatch`, `complete`) so the busy state can be rendered while
/// waiting on the network.
///
/// Use `SessionBuilder` to construct a `SessionController`.
pub struct SessionController<G: Gateway, M: MediaSource> {
    gateway: G,
    media: M,
    target_language: String,
    compression: CompressionSettings,
    templates: Handlebars<'static>,
    state: SessionState,
    next_turn_id: u64,
}

impl<G: Gateway, M: MediaSource> SessionController<G, M> {
    pub fn session_id(&self) -> Uuid {
        self.state.session_id
    }

    pub fn is_busy(&self) -> bool {
        self.state.in_flight.is_some()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.state.transcript
    }

    pub fn draft_text(&self) -> &str {
        &self.state.draft_text
    }

    pub fn pending_attachment(&self) -> Option<&ImagePayload> {
        self.state.pending_attachment.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.state.notice.as_ref()
    }

    /// Returns the current notice and clears it, notices are only
    /// ever shown once.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.state.notice.take()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            transcript: self.state.transcript.messages().to_vec(),
            busy: self.is_busy(),
            notice: self.state.notice.clone(),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn update_draft(&mut self, text: &str) {
        self.state.draft_text = text.to_string();
    }

    fn start_turn(&mut self, request: TurnRequest) -> PendingTurn {
        let id = self.next_turn_id;
        self.next_turn_id += 1;
        self.state.in_flight = Some(id);
        let turn = PendingTurn { id, request };
        tracing::info!(
            session = %self.state.session_id,
            turn = id,
            "Started {:?} turn",
            turn.kind()
        );
        turn
    }

    /// Starts a text turn. Returns `None` without changing anything
    /// when busy or when `text` is blank.
    #[must_use]
    pub fn begin_text(&mut self, text: &str) -> Option<PendingTurn> {
        if self.is_busy() {
            tracing::warn!("Ignoring text submitted while a request is in flight");
            return None;
        }
        if text.trim().is_empty() {
            return None;
        }

        self.state.transcript.push_user(text);
        self.state.draft_text.clear();
        Some(self.start_turn(TurnRequest::Text {
            prompt: text.to_string(),
        }))
    }

    /// Starts a text turn from the current draft.
    #[must_use]
    pub fn submit_draft(&mut self) -> Option<PendingTurn> {
        let text = self.state.draft_text.clone();
        self.begin_text(&text)
    }

    // Only ever called on the way to `begin_attachment`, a photo
    // arriving while busy is dropped rather than sent later
    fn stage_attachment(&mut self, payload: ImagePayload) {
        if self.is_busy() {
            tracing::warn!("Dropping image staged while a request is in flight");
            return;
        }
        self.state.pending_attachment = Some(payload);
    }

    /// Starts an image turn with the staged attachment, consuming it.
    fn begin_attachment(&mut self) -> Option<PendingTurn> {
        if self.is_busy() {
            tracing::warn!("Ignoring image submitted while a request is in flight");
            return None;
        }
        let payload = self.state.pending_attachment.take()?;

        self.state
            .transcript
            .push_user_image(IMAGE_CAPTION, payload.clone());
        Some(self.start_turn(TurnRequest::Image { payload }))
    }

    /// Asks the media source for a photo and starts an image turn
    /// with it. Permission denial and unusable photos leave a notice,
    /// cancelling does nothing at all.
    #[must_use]
    pub async fn pick_image(&mut self) -> Option<PendingTurn> {
        if self.is_busy() {
            tracing::warn!("Ignoring image pick requested while a request is in flight");
            return None;
        }

        let acquired = self.media.acquire_image(&self.compression).await;
        match acquired {
            Ok(payload) => {
                self.stage_attachment(payload);
                self.begin_attachment()
            }
            Err(MediaError::Cancelled) => {
                tracing::debug!("Image pick cancelled");
                None
            }
            Err(MediaError::PermissionDenied) => {
                self.state.notice = Some(Notice::permission_denied());
                None
            }
            Err(err) => {
                tracing::error!("Image acquisition failed: {}", err);
                self.state.notice = Some(Notice::image_unreadable(&err.to_string()));
                None
            }
        }
    }

    /// Sends the turn's request to the gateway. This is the only
    /// step that waits on the network and it never changes the
    /// session.
    pub async fn dispatch(&self, turn: &PendingTurn) -> Result<String, GatewayError> {
        match &turn.request {
            TurnRequest::Text { prompt } => {
                self.gateway
                    .send_text(prompt, &self.target_language)
                    .await
            }
            TurnRequest::Image { payload } => {
                let instruction = prompt::image_analysis(&self.templates, &self.target_language)
                    .map_err(|e| GatewayError::invalid_request(e.to_string()))?;
                self.gateway.send_image(payload, &instruction).await
            }
        }
    }

    /// Folds the result of a turn back into the session and returns
    /// to idle. A turn that isn't the one in flight is ignored.
    pub fn complete(&mut self, turn: PendingTurn, outcome: Result<String, GatewayError>) {
        if self.state.in_flight != Some(turn.id) {
            tracing::warn!("Ignoring result for turn {} which is not in flight", turn.id);
            return;
        }
        self.state.in_flight = None;

        match outcome {
            Ok(text) => {
                self.state.transcript.push_bot(&text);
                tracing::info!(session = %self.state.session_id, turn = turn.id, "Turn completed");
            }
            Err(err) => {
                // Failed turns only ever produce a notice, the
                // transcript is left as is
                tracing::error!(
                    session = %self.state.session_id,
                    turn = turn.id,
                    kind = ?err.kind,
                    status = ?err.http_status,
                    "Turn failed: {}",
                    err
                );
                self.state.notice = Some(match turn.kind() {
                    TurnKind::Text => Notice::text_failed(),
                    TurnKind::Image => Notice::image_failed(),
                });
            }
        }
    }

    /// Dispatches a started turn and completes it with the outcome.
    pub async fn run_turn(&mut self, turn: PendingTurn) {
        let span = tracing::info_span!("turn", session = %self.state.session_id, turn = turn.id);
        let outcome = self.dispatch(&turn).instrument(span).await;
        self.complete(turn, outcome);
    }

    pub async fn on_submit_text(&mut self, text: &str) {
        if let Some(turn) = self.begin_text(text) {
            self.run_turn(turn).await;
        }
    }

    pub async fn on_request_image_pick(&mut self) {
        if let Some(turn) = self.pick_image().await {
            self.run_turn(turn).await;
        }
    }
}

pub struct SessionBuilder<G: Gateway, M: MediaSource> {
    gateway: G,
    media: M,
    greeting: String,
    target_language: String,
    compression: CompressionSettings,
}

impl<G: Gateway, M: MediaSource> SessionBuilder<G, M> {
    pub fn new(gateway: G, media: M) -> Self {
        Self {
            gateway,
            media,
            greeting: DEFAULT_GREETING.to_string(),
            target_language: String::from("Malayalam"),
            compression: CompressionSettings {
                quality: 0.7,
                max_dimension: 1024,
            },
        }
    }

    pub fn from_config(config: &AppConfig, gateway: G, media: M) -> Self {
        Self::new(gateway, media)
            .greeting(&config.greeting)
            .target_language(&config.target_language)
            .compression(CompressionSettings::from(config))
    }

    pub fn greeting(mut self, greeting: &str) -> Self {
        self.greeting = greeting.to_string();
        self
    }

    pub fn target_language(mut self, language: &str) -> Self {
        self.target_language = language.to_string();
        self
    }

    pub fn compression(mut self, settings: CompressionSettings) -> Self {
        self.compression = settings;
        self
    }

    pub fn build(self) -> SessionController<G, M> {
        SessionController {
            gateway: self.gateway,
            media: self.media,
            target_language: self.target_language,
            compression: self.compression,
            templates: prompt::templates(),
            state: SessionState::new(&self.greeting),
            next_turn_id: 1,
        }
    }
}
