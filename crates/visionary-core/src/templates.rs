//! Built-in prompt starters

use crate::model::{ImageStyle, SettingsPatch};
use crate::state::Action;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub prompt: &'static str,
    pub style: ImageStyle,
}

impl PromptTemplate {
    /// Actions that load this template into the editor: prompt text plus style
    pub fn actions(&self) -> [Action; 2] {
        [
            Action::SetPrompt(self.prompt.to_string()),
            Action::UpdateSettings(SettingsPatch {
                style: Some(self.style),
                ..SettingsPatch::default()
            }),
        ]
    }
}

pub const TEMPLATES: &[PromptTemplate] = &[
    PromptTemplate {
        name: "Product shot",
        prompt: "A sleek product on a seamless studio backdrop, softbox lighting, subtle reflections",
        style: ImageStyle::Photorealistic,
    },
    PromptTemplate {
        name: "Portrait",
        prompt: "Close-up portrait of an elderly fisherman, weathered skin, overcast window light",
        style: ImageStyle::Photorealistic,
    },
    PromptTemplate {
        name: "Neon city",
        prompt: "Rain-soaked city street at night, neon signs reflected in puddles, crowded market stalls",
        style: ImageStyle::Cyberpunk,
    },
    PromptTemplate {
        name: "Fantasy landscape",
        prompt: "Floating islands above a misty valley, waterfalls pouring into clouds, dawn light",
        style: ImageStyle::ConceptArt,
    },
    PromptTemplate {
        name: "Anime hero",
        prompt: "A young swordswoman on a cliff edge, wind in her hair, dramatic sky",
        style: ImageStyle::Anime,
    },
    PromptTemplate {
        name: "Still life",
        prompt: "Bowl of lemons and a copper jug on a wooden table, afternoon sun",
        style: ImageStyle::Painting,
    },
    PromptTemplate {
        name: "Space station",
        prompt: "Ring-shaped space station orbiting a gas giant, docking ships, starfield",
        style: ImageStyle::SciFi,
    },
    PromptTemplate {
        name: "Poster",
        prompt: "A single paper crane on a flat pastel background, lots of negative space",
        style: ImageStyle::Minimalist,
    },
];
