//! UI-agnostic application state and its transitions
//!
//! `reduce` is the only way the state changes. It is pure: persisting the
//! history after a transition is the controller's job.

use crate::model::{GeneratedImage, GenerationSettings, SettingsPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Generate,
    History,
    Templates,
    Settings,
}

impl Tab {
    pub fn all() -> Vec<Tab> {
        vec![Tab::Generate, Tab::History, Tab::Templates, Tab::Settings]
    }

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Generate => "Generate",
            Tab::History => "History",
            Tab::Templates => "Templates",
            Tab::Settings => "Settings",
        }
    }

    pub fn index(&self) -> usize {
        Self::all().iter().position(|t| t == self).unwrap_or(0)
    }

    pub fn next(&self) -> Self {
        let all = Self::all();
        all[(self.index() + 1) % all.len()]
    }

    pub fn prev(&self) -> Self {
        let all = Self::all();
        all[(self.index() + all.len() - 1) % all.len()]
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub active_tab: Tab,
    pub prompt: String,
    /// Newest first
    pub history: Vec<GeneratedImage>,
    pub is_generating: bool,
    pub is_assistant_running: bool,
    pub error: Option<String>,
    pub settings: GenerationSettings,
}

impl AppState {
    pub fn new(settings: GenerationSettings, history: Vec<GeneratedImage>) -> Self {
        Self {
            settings,
            history,
            ..Self::default()
        }
    }

    pub fn latest_image(&self) -> Option<&GeneratedImage> {
        self.history.first()
    }

    pub fn favorite_count(&self) -> usize {
        self.history.iter().filter(|img| img.is_favorite).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetTab(Tab),
    SetPrompt(String),
    SetGenerating(bool),
    SetError(Option<String>),
    SetAssistant(bool),
    UpdateSettings(SettingsPatch),
    AddHistory(GeneratedImage),
    /// Flip the favorite flag of the image with this id
    ToggleFavorite(String),
}

impl Action {
    /// Whether applying this action changes the persisted history list
    pub fn mutates_history(&self) -> bool {
        matches!(self, Action::AddHistory(_) | Action::ToggleFavorite(_))
    }
}

pub fn reduce(state: &AppState, action: Action) -> AppState {
    match action {
        Action::SetTab(tab) => AppState {
            active_tab: tab,
            ..state.clone()
        },
        Action::SetPrompt(prompt) => AppState {
            prompt,
            ..state.clone()
        },
        Action::SetGenerating(is_generating) => AppState {
            is_generating,
            ..state.clone()
        },
        Action::SetError(error) => AppState {
            error,
            ..state.clone()
        },
        Action::SetAssistant(is_assistant_running) => AppState {
            is_assistant_running,
            ..state.clone()
        },
        Action::UpdateSettings(patch) => AppState {
            settings: patch.apply(&state.settings),
            ..state.clone()
        },
        Action::AddHistory(image) => {
            let mut history = Vec::with_capacity(state.history.len() + 1);
            history.extend(
                state
                    .history
                    .iter()
                    .filter(|existing| existing.id != image.id)
                    .cloned(),
            );
            history.insert(0, image);
            AppState {
                history,
                ..state.clone()
            }
        }
        Action::ToggleFavorite(id) => {
            let history = state
                .history
                .iter()
                .map(|img| {
                    if img.id == id {
                        GeneratedImage {
                            is_favorite: !img.is_favorite,
                            ..img.clone()
                        }
                    } else {
                        img.clone()
                    }
                })
                .collect();
            AppState {
                history,
                ..state.clone()
            }
        }
    }
}
