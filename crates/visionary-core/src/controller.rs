//! Application state controller
//!
//! Owns the single [`AppState`] snapshot and the history store. Every change
//! goes through [`Controller::dispatch`]; history-changing actions rewrite the
//! persisted list in full.
//!
//! The generation and assist flows are split into `begin_*` / `finish_*` so a
//! UI event loop can run the network call as a background task and feed the
//! result back later. The two flows have separate in-flight flags and never
//! wait on each other; both can write the prompt, and the last one to finish
//! wins.

use crate::ai::{GenerationError, ImageGenerator, PromptAssistant};
use crate::history::{HistoryStore, KvStore, StoreError};
use crate::model::{GeneratedImage, GenerationSettings, ImageMetadata};
use crate::state::{reduce, Action, AppState};

pub const EMPTY_PROMPT_ERROR: &str = "Please enter a prompt.";

/// Snapshot of what was submitted for one generation.
///
/// The seed sentinel has already been replaced by a concrete seed, so the
/// value sent to the model and the one recorded in history agree.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub settings: GenerationSettings,
}

impl GenerationRequest {
    pub fn new(prompt: &str, settings: &GenerationSettings) -> Self {
        Self {
            prompt: prompt.to_string(),
            settings: GenerationSettings {
                seed: settings.resolve_seed(),
                ..settings.clone()
            },
        }
    }

    pub fn into_image(self, url: String) -> GeneratedImage {
        GeneratedImage {
            id: uuid::Uuid::new_v4().to_string(),
            url,
            prompt: self.prompt,
            timestamp: chrono::Utc::now().timestamp_millis(),
            style: self.settings.style,
            aspect_ratio: self.settings.aspect_ratio,
            is_favorite: false,
            metadata: ImageMetadata {
                model: self.settings.model_id,
                seed: self.settings.seed,
                guidance_scale: self.settings.guidance_scale,
            },
        }
    }
}

pub struct Controller<S: KvStore> {
    state: AppState,
    history: HistoryStore<S>,
}

impl<S: KvStore> Controller<S> {
    pub fn new(history: HistoryStore<S>, settings: GenerationSettings) -> Self {
        let entries = history.load();
        tracing::info!(entries = entries.len(), "history loaded");
        Self {
            state: AppState::new(settings, entries),
            history,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn history_store(&self) -> &HistoryStore<S> {
        &self.history
    }

    /// Apply one action. The in-memory change always sticks; a failed save
    /// is reported but not rolled back.
    pub fn dispatch(&mut self, action: Action) -> Result<(), StoreError> {
        let persist = action.mutates_history();
        self.state = reduce(&self.state, action);

        if persist {
            if let Err(e) = self.history.save(&self.state.history) {
                tracing::error!(error = %e, "failed to persist history");
                return Err(e);
            }
        }
        Ok(())
    }

    /// Validate the prompt and mark a generation as in flight.
    ///
    /// Returns `None` (and sets the error) when the prompt is blank; no
    /// request should be sent in that case.
    pub fn begin_generation(&mut self) -> Option<GenerationRequest> {
        if self.state.prompt.trim().is_empty() {
            self.apply(Action::SetError(Some(EMPTY_PROMPT_ERROR.to_string())));
            return None;
        }

        self.apply(Action::SetGenerating(true));
        self.apply(Action::SetError(None));

        let request = GenerationRequest::new(&self.state.prompt, &self.state.settings);
        tracing::debug!(seed = request.settings.seed, "generation started");
        Some(request)
    }

    pub fn finish_generation(
        &mut self,
        request: GenerationRequest,
        outcome: Result<String, GenerationError>,
    ) -> Result<(), StoreError> {
        let result = match outcome {
            Ok(url) => {
                let image = request.into_image(url);
                tracing::info!(id = %image.id, seed = image.metadata.seed, "image generated");
                self.dispatch(Action::AddHistory(image))
            }
            Err(e) => {
                self.apply(Action::SetError(Some(e.to_string())));
                Ok(())
            }
        };
        self.apply(Action::SetGenerating(false));
        result
    }

    pub fn cancel_generation(&mut self) {
        if self.state.is_generating {
            tracing::info!("generation cancelled");
            self.apply(Action::SetGenerating(false));
        }
    }

    /// Mark prompt assist as running and hand back the prompt to expand.
    /// A blank prompt is left alone and returns `None`.
    pub fn begin_assist(&mut self) -> Option<String> {
        if self.state.prompt.trim().is_empty() {
            return None;
        }
        self.apply(Action::SetAssistant(true));
        Some(self.state.prompt.clone())
    }

    pub fn finish_assist(&mut self, improved: String) {
        self.apply(Action::SetPrompt(improved));
        self.apply(Action::SetAssistant(false));
    }

    pub fn cancel_assist(&mut self) {
        if self.state.is_assistant_running {
            tracing::info!("prompt assist cancelled");
            self.apply(Action::SetAssistant(false));
        }
    }

    // Only for actions that leave history untouched, so there is nothing to save
    fn apply(&mut self, action: Action) {
        debug_assert!(!action.mutates_history());
        self.state = reduce(&self.state, action);
    }
}

/// Run a whole generation: validate, call the generator, record the result
pub async fn generate<S, G>(controller: &mut Controller<S>, generator: &G) -> Result<(), StoreError>
where
    S: KvStore,
    G: ImageGenerator + ?Sized,
{
    let Some(request) = controller.begin_generation() else {
        return Ok(());
    };
    let outcome = generator
        .generate_image(&request.prompt, &request.settings)
        .await;
    controller.finish_generation(request, outcome)
}

/// Run a whole prompt assist: expand the current prompt in place
pub async fn assist<S, A>(controller: &mut Controller<S>, assistant: &A)
where
    S: KvStore,
    A: PromptAssistant + ?Sized,
{
    let Some(prompt) = controller.begin_assist() else {
        return;
    };
    let improved = assistant.improve_prompt(&prompt).await;
    controller.finish_assist(improved);
}
