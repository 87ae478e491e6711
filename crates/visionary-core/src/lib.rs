pub mod ai;
pub mod config;
pub mod controller;
pub mod history;
pub mod model;
pub mod state;
pub mod templates;

// Re-export main types for convenience
pub use ai::{GeminiClient, GenerationError, ImageGenerator, PromptAssistant};
pub use config::Config;
pub use controller::{assist, generate, Controller, GenerationRequest};
pub use history::{FileKvStore, HistoryStore, KvStore, MemoryKvStore, StoreError};
pub use model::{AspectRatio, GeneratedImage, GenerationSettings, ImageStyle, SettingsPatch, SEED_RANDOM};
pub use state::{Action, AppState, Tab};
pub use templates::{PromptTemplate, TEMPLATES};
