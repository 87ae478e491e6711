use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use visionary_core::controller::EMPTY_PROMPT_ERROR;
use visionary_core::model::SEED_RANDOM;
use visionary_core::{
    Action, AppState, Config, Controller, FileKvStore, GeminiClient, GeneratedImage,
    GenerationError, GenerationRequest, SettingsPatch, StoreError, Tab, TEMPLATES,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    Model,
    Style,
    AspectRatio,
    GuidanceScale,
    Steps,
    Seed,
    NegativePrompt,
}

impl SettingsField {
    pub fn all() -> Vec<SettingsField> {
        vec![
            SettingsField::Model,
            SettingsField::Style,
            SettingsField::AspectRatio,
            SettingsField::GuidanceScale,
            SettingsField::Steps,
            SettingsField::Seed,
            SettingsField::NegativePrompt,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            SettingsField::Model => "Model",
            SettingsField::Style => "Style",
            SettingsField::AspectRatio => "Aspect ratio",
            SettingsField::GuidanceScale => "Guidance scale",
            SettingsField::Steps => "Steps",
            SettingsField::Seed => "Seed",
            SettingsField::NegativePrompt => "Negative prompt",
        }
    }

    /// Fields edited as free text rather than stepped with Left/Right
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            SettingsField::Model | SettingsField::Seed | SettingsField::NegativePrompt
        )
    }
}

const GUIDANCE_STEP: f64 = 0.5;

/// Convert a character index to a byte index for UTF-8 safe string operations
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Prompt editor
    pub prompt_cursor: usize,

    // List selections
    pub history_state: ListState,
    pub templates_state: ListState,
    pub settings_state: ListState,

    // Text editing of a settings field
    pub editing_field: Option<SettingsField>,
    pub field_input: String,
    pub field_cursor: usize,

    pub animation_frame: u8,

    pub controller: Controller<FileKvStore>,
    pub gemini: Option<GeminiClient>,

    // In-flight background work, polled from the main loop
    pub generation_task: Option<(GenerationRequest, JoinHandle<Result<String, GenerationError>>)>,
    pub assist_task: Option<JoinHandle<String>>,
}

impl App {
    pub fn new(controller: Controller<FileKvStore>, gemini: Option<GeminiClient>) -> Self {
        let mut history_state = ListState::default();
        if !controller.state().history.is_empty() {
            history_state.select(Some(0));
        }
        let mut templates_state = ListState::default();
        templates_state.select(Some(0));
        let mut settings_state = ListState::default();
        settings_state.select(Some(0));

        let prompt_cursor = controller.state().prompt.chars().count();

        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            prompt_cursor,
            history_state,
            templates_state,
            settings_state,
            editing_field: None,
            field_input: String::new(),
            field_cursor: 0,
            animation_frame: 0,
            controller,
            gemini,
            generation_task: None,
            assist_task: None,
        }
    }

    pub fn state(&self) -> &AppState {
        self.controller.state()
    }

    pub fn dispatch(&mut self, action: Action) {
        if let Err(e) = self.controller.dispatch(action) {
            self.report_store_error(e);
        }
    }

    fn report_store_error(&mut self, e: StoreError) {
        // dispatching SetError cannot touch the store, so this cannot fail again
        let _ = self
            .controller
            .dispatch(Action::SetError(Some(e.to_string())));
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.dispatch(Action::SetTab(tab));
    }

    // Background work

    pub fn start_generation(&mut self) {
        // One generation at a time from this front end; a blank prompt
        // still reports its error while one is running
        if self.generation_task.is_some() {
            if self.state().prompt.trim().is_empty() {
                self.dispatch(Action::SetError(Some(EMPTY_PROMPT_ERROR.to_string())));
            }
            return;
        }
        let Some(request) = self.controller.begin_generation() else {
            return;
        };

        match self.gemini.clone() {
            Some(client) => {
                let prompt = request.prompt.clone();
                let settings = request.settings.clone();
                let handle = tokio::spawn(async move {
                    client.generate_image(&prompt, &settings).await
                });
                self.generation_task = Some((request, handle));
            }
            None => {
                if let Err(e) = self
                    .controller
                    .finish_generation(request, Err(GenerationError::MissingApiKey))
                {
                    self.report_store_error(e);
                }
            }
        }
    }

    pub fn start_assist(&mut self) {
        if self.assist_task.is_some() {
            return;
        }
        let Some(client) = self.gemini.clone() else {
            tracing::debug!("prompt assist skipped, no API key");
            return;
        };
        let Some(prompt) = self.controller.begin_assist() else {
            return;
        };
        self.assist_task = Some(tokio::spawn(async move {
            client.improve_prompt(&prompt).await
        }));
    }

    /// Feed results of finished background tasks back into the controller
    pub async fn poll_tasks(&mut self) {
        if self
            .generation_task
            .as_ref()
            .is_some_and(|(_, handle)| handle.is_finished())
        {
            if let Some((request, handle)) = self.generation_task.take() {
                match handle.await {
                    Ok(outcome) => {
                        if let Err(e) = self.controller.finish_generation(request, outcome) {
                            self.report_store_error(e);
                        }
                        if !self.state().history.is_empty() {
                            self.history_state.select(Some(0));
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "generation task failed");
                        self.controller.cancel_generation();
                        self.dispatch(Action::SetError(Some(format!("Generation task failed: {}", e))));
                    }
                }
            }
        }

        if self
            .assist_task
            .as_ref()
            .is_some_and(|handle| handle.is_finished())
        {
            if let Some(handle) = self.assist_task.take() {
                match handle.await {
                    Ok(improved) => {
                        self.controller.finish_assist(improved);
                        self.prompt_cursor = self.state().prompt.chars().count();
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "prompt assist task failed");
                        self.controller.cancel_assist();
                    }
                }
            }
        }
    }

    pub fn has_running_tasks(&self) -> bool {
        self.generation_task.is_some() || self.assist_task.is_some()
    }

    /// Abort whatever is in flight and clear the matching flags
    pub fn cancel_tasks(&mut self) {
        if let Some((_, handle)) = self.generation_task.take() {
            handle.abort();
            self.controller.cancel_generation();
        }
        if let Some(handle) = self.assist_task.take() {
            handle.abort();
            self.controller.cancel_assist();
        }
    }

    pub fn tick_animation(&mut self) {
        if self.has_running_tasks() {
            self.animation_frame = (self.animation_frame + 1) % 4;
        }
    }

    // Prompt editing

    fn set_prompt(&mut self, prompt: String) {
        self.dispatch(Action::SetPrompt(prompt));
    }

    pub fn prompt_insert(&mut self, c: char) {
        let mut prompt = self.state().prompt.clone();
        let byte_pos = char_to_byte_index(&prompt, self.prompt_cursor);
        prompt.insert(byte_pos, c);
        self.prompt_cursor += 1;
        self.set_prompt(prompt);
    }

    pub fn prompt_backspace(&mut self) {
        if self.prompt_cursor == 0 {
            return;
        }
        let mut prompt = self.state().prompt.clone();
        self.prompt_cursor -= 1;
        let byte_pos = char_to_byte_index(&prompt, self.prompt_cursor);
        prompt.remove(byte_pos);
        self.set_prompt(prompt);
    }

    pub fn prompt_delete(&mut self) {
        let mut prompt = self.state().prompt.clone();
        if self.prompt_cursor < prompt.chars().count() {
            let byte_pos = char_to_byte_index(&prompt, self.prompt_cursor);
            prompt.remove(byte_pos);
            self.set_prompt(prompt);
        }
    }

    pub fn prompt_clear(&mut self) {
        self.prompt_cursor = 0;
        self.set_prompt(String::new());
    }

    pub fn prompt_cursor_left(&mut self) {
        self.prompt_cursor = self.prompt_cursor.saturating_sub(1);
    }

    pub fn prompt_cursor_right(&mut self) {
        let char_count = self.state().prompt.chars().count();
        self.prompt_cursor = (self.prompt_cursor + 1).min(char_count);
    }

    pub fn prompt_cursor_home(&mut self) {
        self.prompt_cursor = 0;
    }

    pub fn prompt_cursor_end(&mut self) {
        self.prompt_cursor = self.state().prompt.chars().count();
    }

    // History

    pub fn selected_image(&self) -> Option<&GeneratedImage> {
        self.history_state
            .selected()
            .and_then(|i| self.state().history.get(i))
    }

    pub fn history_nav_down(&mut self) {
        let len = self.state().history.len();
        if len > 0 {
            let i = self.history_state.selected().unwrap_or(0);
            self.history_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn history_nav_up(&mut self) {
        if !self.state().history.is_empty() {
            let i = self.history_state.selected().unwrap_or(0);
            self.history_state.select(Some(i.saturating_sub(1)));
        }
    }

    pub fn toggle_selected_favorite(&mut self) {
        if let Some(id) = self.selected_image().map(|img| img.id.clone()) {
            self.dispatch(Action::ToggleFavorite(id));
        }
    }

    /// Load the selected image's prompt back into the editor
    pub fn reuse_selected_prompt(&mut self) {
        if let Some(prompt) = self.selected_image().map(|img| img.prompt.clone()) {
            self.prompt_cursor = prompt.chars().count();
            self.set_prompt(prompt);
            self.set_tab(Tab::Generate);
        }
    }

    // Templates

    pub fn templates_nav_down(&mut self) {
        let i = self.templates_state.selected().unwrap_or(0);
        self.templates_state
            .select(Some((i + 1).min(TEMPLATES.len().saturating_sub(1))));
    }

    pub fn templates_nav_up(&mut self) {
        let i = self.templates_state.selected().unwrap_or(0);
        self.templates_state.select(Some(i.saturating_sub(1)));
    }

    pub fn apply_selected_template(&mut self) {
        let Some(template) = self
            .templates_state
            .selected()
            .and_then(|i| TEMPLATES.get(i))
        else {
            return;
        };
        for action in template.actions() {
            self.dispatch(action);
        }
        self.prompt_cursor = template.prompt.chars().count();
        self.set_tab(Tab::Generate);
    }

    // Settings

    pub fn selected_field(&self) -> SettingsField {
        let fields = SettingsField::all();
        self.settings_state
            .selected()
            .and_then(|i| fields.get(i).copied())
            .unwrap_or(SettingsField::Model)
    }

    pub fn settings_nav_down(&mut self) {
        let len = SettingsField::all().len();
        let i = self.settings_state.selected().unwrap_or(0);
        self.settings_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn settings_nav_up(&mut self) {
        let i = self.settings_state.selected().unwrap_or(0);
        self.settings_state.select(Some(i.saturating_sub(1)));
    }

    pub fn field_value(&self, field: SettingsField) -> String {
        let settings = &self.state().settings;
        match field {
            SettingsField::Model => settings.model_id.clone(),
            SettingsField::Style => settings.style.as_str().to_string(),
            SettingsField::AspectRatio => settings.aspect_ratio.as_str().to_string(),
            SettingsField::GuidanceScale => format!("{:.1}", settings.guidance_scale),
            SettingsField::Steps => settings.steps.to_string(),
            SettingsField::Seed => {
                if settings.seed == SEED_RANDOM {
                    "random".to_string()
                } else {
                    settings.seed.to_string()
                }
            }
            SettingsField::NegativePrompt => settings.negative_prompt.clone(),
        }
    }

    /// Step the selected field by one notch in either direction
    pub fn adjust_selected_field(&mut self, forward: bool) {
        let settings = self.state().settings.clone();
        let patch = match self.selected_field() {
            SettingsField::Style => SettingsPatch {
                style: Some(if forward { settings.style.next() } else { settings.style.prev() }),
                ..SettingsPatch::default()
            },
            SettingsField::AspectRatio => SettingsPatch {
                aspect_ratio: Some(if forward {
                    settings.aspect_ratio.next()
                } else {
                    settings.aspect_ratio.prev()
                }),
                ..SettingsPatch::default()
            },
            SettingsField::GuidanceScale => {
                let delta = if forward { GUIDANCE_STEP } else { -GUIDANCE_STEP };
                SettingsPatch {
                    guidance_scale: Some((settings.guidance_scale + delta).max(0.0)),
                    ..SettingsPatch::default()
                }
            }
            SettingsField::Steps => SettingsPatch {
                steps: Some(if forward {
                    settings.steps.saturating_add(1)
                } else {
                    settings.steps.saturating_sub(1)
                }),
                ..SettingsPatch::default()
            },
            SettingsField::Seed => SettingsPatch {
                seed: Some(if forward {
                    settings.seed.saturating_add(1)
                } else {
                    settings.seed.saturating_sub(1).max(SEED_RANDOM)
                }),
                ..SettingsPatch::default()
            },
            SettingsField::Model | SettingsField::NegativePrompt => return,
        };
        self.dispatch(Action::UpdateSettings(patch));
    }

    pub fn randomize_seed(&mut self) {
        self.dispatch(Action::UpdateSettings(SettingsPatch {
            seed: Some(SEED_RANDOM),
            ..SettingsPatch::default()
        }));
    }

    pub fn begin_field_edit(&mut self) {
        let field = self.selected_field();
        if !field.is_text() {
            return;
        }
        self.field_input = match field {
            SettingsField::Seed if self.state().settings.seed == SEED_RANDOM => String::new(),
            _ => self.field_value(field),
        };
        self.field_cursor = self.field_input.chars().count();
        self.editing_field = Some(field);
        self.input_mode = InputMode::Editing;
    }

    pub fn cancel_field_edit(&mut self) {
        self.editing_field = None;
        self.field_input.clear();
        self.field_cursor = 0;
        self.input_mode = InputMode::Normal;
    }

    pub fn commit_field_edit(&mut self) {
        let Some(field) = self.editing_field else {
            return;
        };
        let value = self.field_input.trim().to_string();

        let patch = match field {
            SettingsField::Model => {
                if value.is_empty() {
                    self.dispatch(Action::SetError(Some("Model id cannot be empty.".to_string())));
                    return;
                }
                if let Err(e) = Config::save_image_model(&value) {
                    tracing::warn!(error = %e, "could not save model to config");
                }
                SettingsPatch {
                    model_id: Some(value),
                    ..SettingsPatch::default()
                }
            }
            SettingsField::Seed => {
                let seed = if value.is_empty() || value.eq_ignore_ascii_case("random") {
                    SEED_RANDOM
                } else {
                    match value.parse::<i64>() {
                        Ok(seed) => seed,
                        Err(_) => {
                            self.dispatch(Action::SetError(Some(format!(
                                "Seed must be an integer, got \"{}\".",
                                value
                            ))));
                            return;
                        }
                    }
                };
                SettingsPatch {
                    seed: Some(seed),
                    ..SettingsPatch::default()
                }
            }
            SettingsField::NegativePrompt => SettingsPatch {
                negative_prompt: Some(value),
                ..SettingsPatch::default()
            },
            _ => SettingsPatch::default(),
        };

        if !patch.is_empty() {
            self.dispatch(Action::UpdateSettings(patch));
        }
        self.cancel_field_edit();
    }

    pub fn field_insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.field_input, self.field_cursor);
        self.field_input.insert(byte_pos, c);
        self.field_cursor += 1;
    }

    pub fn field_backspace(&mut self) {
        if self.field_cursor > 0 {
            self.field_cursor -= 1;
            let byte_pos = char_to_byte_index(&self.field_input, self.field_cursor);
            self.field_input.remove(byte_pos);
        }
    }

    pub fn field_cursor_left(&mut self) {
        self.field_cursor = self.field_cursor.saturating_sub(1);
    }

    pub fn field_cursor_right(&mut self) {
        let char_count = self.field_input.chars().count();
        self.field_cursor = (self.field_cursor + 1).min(char_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use visionary_core::{AspectRatio, GenerationSettings, HistoryStore, ImageStyle};

    fn app(dir: &TempDir) -> App {
        let controller = Controller::new(
            HistoryStore::new(FileKvStore::new(dir.path())),
            GenerationSettings::default(),
        );
        App::new(controller, None)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.prompt_insert(c);
        }
    }

    #[test]
    fn test_char_to_byte_index() {
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[test]
    fn test_prompt_editing_is_utf8_safe() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);

        type_text(&mut app, "café");
        app.prompt_cursor_left();
        app.prompt_backspace();
        assert_eq!(app.state().prompt, "caé");

        app.prompt_cursor_home();
        app.prompt_delete();
        assert_eq!(app.state().prompt, "aé");
        assert_eq!(app.prompt_cursor, 0);
    }

    #[tokio::test]
    async fn test_generation_without_key_sets_error() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        type_text(&mut app, "a red fox in snow");

        app.start_generation();

        assert!(app.generation_task.is_none());
        assert!(!app.state().is_generating);
        assert_eq!(
            app.state().error.as_deref(),
            Some("Gemini API key not configured (set GEMINI_API_KEY)")
        );
        assert!(app.state().history.is_empty());
    }

    #[tokio::test]
    async fn test_blank_prompt_sets_error() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        type_text(&mut app, "   ");

        app.start_generation();

        assert_eq!(app.state().error.as_deref(), Some("Please enter a prompt."));
    }

    #[tokio::test]
    async fn test_blank_prompt_reports_error_while_generating() {
        let dir = TempDir::new().unwrap();
        let controller = Controller::new(
            HistoryStore::new(FileKvStore::new(dir.path())),
            GenerationSettings::default(),
        );
        let client = GeminiClient::new("test-key").with_api_base("http://127.0.0.1:1");
        let mut app = App::new(controller, Some(client));
        type_text(&mut app, "a red fox in snow");

        app.start_generation();
        assert!(app.generation_task.is_some());

        app.prompt_clear();
        app.start_generation();

        assert_eq!(app.state().error.as_deref(), Some(EMPTY_PROMPT_ERROR));
        assert!(app.state().is_generating);
        app.cancel_tasks();
    }

    #[tokio::test]
    async fn test_assist_failure_keeps_prompt() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.gemini = Some(GeminiClient::new("test-key").with_api_base("http://127.0.0.1:1"));
        type_text(&mut app, "cat");

        app.start_assist();
        assert!(app.state().is_assistant_running);

        while app.assist_task.is_some() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            app.poll_tasks().await;
        }

        assert_eq!(app.state().prompt, "cat");
        assert!(!app.state().is_assistant_running);
        assert!(app.state().error.is_none());
    }

    #[test]
    fn test_adjust_fields() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);

        app.settings_state.select(Some(2));
        assert_eq!(app.selected_field(), SettingsField::AspectRatio);
        app.adjust_selected_field(true);
        assert_eq!(app.state().settings.aspect_ratio, AspectRatio::Landscape);
        assert_eq!(app.state().settings.style, ImageStyle::Photorealistic);

        app.settings_state.select(Some(5));
        app.adjust_selected_field(false);
        assert_eq!(app.state().settings.seed, SEED_RANDOM);
        app.adjust_selected_field(true);
        assert_eq!(app.state().settings.seed, 0);
    }

    #[test]
    fn test_seed_edit_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.settings_state.select(Some(5));

        app.begin_field_edit();
        assert_eq!(app.editing_field, Some(SettingsField::Seed));
        for c in "12x".chars() {
            app.field_insert(c);
        }
        app.commit_field_edit();
        assert!(app.state().error.is_some());
        assert_eq!(app.state().settings.seed, SEED_RANDOM);

        app.field_backspace();
        app.commit_field_edit();
        assert_eq!(app.state().settings.seed, 12);
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn test_apply_template_switches_to_generate() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.set_tab(Tab::Templates);
        app.templates_nav_down();

        app.apply_selected_template();

        assert_eq!(app.state().active_tab, Tab::Generate);
        assert_eq!(app.state().prompt, TEMPLATES[1].prompt);
        assert_eq!(app.prompt_cursor, TEMPLATES[1].prompt.chars().count());
    }
}
