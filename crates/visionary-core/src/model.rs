//! Generation data model
//!
//! Settings, styles, aspect ratios and the generated-image records kept in
//! history. Field names serialize in camelCase so a stored history stays
//! readable by the web build of Visionary.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Seed value that asks for a random seed at generation time
pub const SEED_RANDOM: i64 = -1;

/// Upper bound (exclusive) for randomly picked seeds
pub const SEED_RANGE: i64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageStyle {
    Photorealistic,
    Anime,
    #[serde(rename = "Digital Art")]
    DigitalArt,
    Painting,
    #[serde(rename = "Concept Art")]
    ConceptArt,
    Cyberpunk,
    Surreal,
    Minimalist,
    Vintage,
    #[serde(rename = "Sci-Fi")]
    SciFi,
}

impl ImageStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStyle::Photorealistic => "Photorealistic",
            ImageStyle::Anime => "Anime",
            ImageStyle::DigitalArt => "Digital Art",
            ImageStyle::Painting => "Painting",
            ImageStyle::ConceptArt => "Concept Art",
            ImageStyle::Cyberpunk => "Cyberpunk",
            ImageStyle::Surreal => "Surreal",
            ImageStyle::Minimalist => "Minimalist",
            ImageStyle::Vintage => "Vintage",
            ImageStyle::SciFi => "Sci-Fi",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(s.trim()))
    }

    pub fn all() -> Vec<ImageStyle> {
        vec![
            ImageStyle::Photorealistic,
            ImageStyle::Anime,
            ImageStyle::DigitalArt,
            ImageStyle::Painting,
            ImageStyle::ConceptArt,
            ImageStyle::Cyberpunk,
            ImageStyle::Surreal,
            ImageStyle::Minimalist,
            ImageStyle::Vintage,
            ImageStyle::SciFi,
        ]
    }

    pub fn next(&self) -> Self {
        cycle(&Self::all(), *self, 1)
    }

    pub fn prev(&self) -> Self {
        cycle(&Self::all(), *self, -1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "3:4")]
    Tall,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Standard => "4:3",
            AspectRatio::Tall => "3:4",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::all().into_iter().find(|ratio| ratio.as_str() == s.trim())
    }

    pub fn all() -> Vec<AspectRatio> {
        vec![
            AspectRatio::Square,
            AspectRatio::Landscape,
            AspectRatio::Portrait,
            AspectRatio::Standard,
            AspectRatio::Tall,
        ]
    }

    pub fn next(&self) -> Self {
        cycle(&Self::all(), *self, 1)
    }

    pub fn prev(&self) -> Self {
        cycle(&Self::all(), *self, -1)
    }
}

fn cycle<T: Copy + PartialEq>(items: &[T], current: T, step: isize) -> T {
    let len = items.len() as isize;
    let idx = items.iter().position(|item| *item == current).unwrap_or(0) as isize;
    items[(idx + step).rem_euclid(len) as usize]
}

/// Parameters applied to a generation request.
///
/// Values are not range-checked: a negative guidance scale or zero steps are
/// carried through to the request as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    pub model_id: String,
    pub aspect_ratio: AspectRatio,
    pub style: ImageStyle,
    pub guidance_scale: f64,
    pub negative_prompt: String,
    pub steps: u32,
    pub seed: i64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model_id: "gemini-2.5-flash-image".to_string(),
            aspect_ratio: AspectRatio::Square,
            style: ImageStyle::Photorealistic,
            guidance_scale: 7.5,
            negative_prompt: "blurry, distorted, low quality, text, watermark".to_string(),
            steps: 30,
            seed: SEED_RANDOM,
        }
    }
}

impl GenerationSettings {
    /// Seed to use for one request: the sentinel becomes a random value
    pub fn resolve_seed(&self) -> i64 {
        resolve_seed(self.seed)
    }
}

pub fn resolve_seed(seed: i64) -> i64 {
    if seed == SEED_RANDOM {
        rand::rng().random_range(0..SEED_RANGE)
    } else {
        seed
    }
}

/// Partial update of [`GenerationSettings`]; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub model_id: Option<String>,
    pub aspect_ratio: Option<AspectRatio>,
    pub style: Option<ImageStyle>,
    pub guidance_scale: Option<f64>,
    pub negative_prompt: Option<String>,
    pub steps: Option<u32>,
    pub seed: Option<i64>,
}

impl SettingsPatch {
    pub fn apply(&self, settings: &GenerationSettings) -> GenerationSettings {
        GenerationSettings {
            model_id: self.model_id.clone().unwrap_or_else(|| settings.model_id.clone()),
            aspect_ratio: self.aspect_ratio.unwrap_or(settings.aspect_ratio),
            style: self.style.unwrap_or(settings.style),
            guidance_scale: self.guidance_scale.unwrap_or(settings.guidance_scale),
            negative_prompt: self
                .negative_prompt
                .clone()
                .unwrap_or_else(|| settings.negative_prompt.clone()),
            steps: self.steps.unwrap_or(settings.steps),
            seed: self.seed.unwrap_or(settings.seed),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Model parameters recorded alongside a generated image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub model: String,
    pub seed: i64,
    pub guidance_scale: f64,
}

/// One successful generation, as stored in history.
///
/// Only `is_favorite` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub id: String,
    /// Image payload, usually a `data:` URI
    pub url: String,
    pub prompt: String,
    /// Creation time in epoch milliseconds
    pub timestamp: i64,
    pub style: ImageStyle,
    pub aspect_ratio: AspectRatio,
    pub is_favorite: bool,
    pub metadata: ImageMetadata,
}

impl GeneratedImage {
    /// Local creation time, e.g. `2024-06-01 14:03`
    pub fn created_label(&self) -> String {
        chrono::DateTime::<chrono::Utc>::from_timestamp_millis(self.timestamp)
            .map(|utc| {
                utc.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Mime type and approximate decoded size of a `data:` payload.
    /// Plain URLs are returned as-is.
    pub fn payload_summary(&self) -> String {
        let Some(rest) = self.url.strip_prefix("data:") else {
            return self.url.clone();
        };
        let Some((header, data)) = rest.split_once(',') else {
            return "malformed data URI".to_string();
        };
        let mime = header.split(';').next().unwrap_or_default();
        let padding = data.bytes().rev().take_while(|b| *b == b'=').count();
        let bytes = (data.len() / 4 * 3).saturating_sub(padding);
        format!("{} ({:.1} KB)", mime, bytes as f64 / 1024.0)
    }
}
