/// Story generation
///
/// Turns a list of visited places into a short narrative using the Gemini
/// `generateContent` endpoint. Any failure, a missing API key, or an empty
/// answer yields a locally built fallback story instead.
use crate::{
    config::StoryConfig,
    error::{DistimError, DistimResult},
    metrics,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Places used when the visitor has not selected any
pub const DEFAULT_PLACES: [&str; 8] = [
    "Piața Unirii",
    "Piața Victoriei",
    "Catedrala Mitropolitană",
    "Opera Națională",
    "Bastionul Theresia",
    "Parcul Rozelor",
    "Muzeul de Artă",
    "Podul Decebal",
];

/// Where a story's text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorySource {
    Model,
    Fallback,
}

impl StorySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorySource::Model => "model",
            StorySource::Fallback => "fallback",
        }
    }
}

/// A generated story
#[derive(Debug, Clone, Serialize)]
pub struct Story {
    pub places: Vec<String>,
    pub text: String,
    pub source: StorySource,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

/// Story generator client
#[derive(Clone)]
pub struct StoryGenerator {
    http_client: reqwest::Client,
    config: StoryConfig,
}

impl StoryGenerator {
    pub fn new(config: StoryConfig) -> DistimResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("DisTim/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DistimError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        if config.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; stories will use the local fallback");
        }

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Generate a story for the given places; never fails
    pub async fn generate(&self, places: &[String]) -> Story {
        let places: Vec<String> = if places.is_empty() {
            DEFAULT_PLACES.iter().map(|p| p.to_string()).collect()
        } else {
            places.to_vec()
        };

        let (text, source) = match self.config.api_key.as_deref() {
            None => (build_fallback_story(&places), StorySource::Fallback),
            Some(api_key) => match self.request_story(api_key, &places).await {
                Ok(text) if !text.trim().is_empty() => (text.trim().to_string(), StorySource::Model),
                Ok(_) => {
                    tracing::warn!("Story model returned an empty response, using fallback");
                    (build_fallback_story(&places), StorySource::Fallback)
                }
                Err(e) => {
                    tracing::error!("Story model error, using fallback: {}", e);
                    (build_fallback_story(&places), StorySource::Fallback)
                }
            },
        };

        metrics::record_story(source.as_str());

        Story {
            places,
            text,
            source,
        }
    }

    async fn request_story(&self, api_key: &str, places: &[String]) -> DistimResult<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.model
        );

        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![Part {
                    text: Some(build_prompt(places)),
                }],
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| DistimError::Upstream(format!("Story request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(DistimError::Upstream(format!(
                "Story model returned status {}",
                response.status()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| DistimError::Upstream(format!("Invalid story response: {}", e)))?;

        Ok(extract_text(parsed))
    }
}

fn extract_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

/// Prompt asking for a short cinematic walk through the places
pub fn build_prompt(places: &[String]) -> String {
    let list = places
        .iter()
        .map(|p| format!("• {}", p))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Scrie o mini poveste cinematografică, frumoasă și emoționantă, despre o plimbare prin Timișoara.\n\
         Punctele vizitate sunt:\n\n\
         {}\n\n\
         Povestea trebuie să aibă:\n\
         - 2-3 paragrafe\n\
         - ton cald, poetic, inspirațional\n\
         - detalii vizuale și atmosferă\n\
         - să fie legată de locurile reale\n\
         - să se termine cu o notă optimistă.\n\n\
         Scrie în limba română.",
        list
    )
}

/// Deterministic story used whenever the model is unavailable
pub fn build_fallback_story(places: &[String]) -> String {
    let list = places.join("\n• ");

    format!(
        "Seara cobora peste Timișoara, iar pașii tăi te-au purtat printre lumini calde \
         și clădiri încărcate de istorie. De-a lungul drumului ai trecut pe la:\n\n\
         • {}\n\n\
         Chiar dacă povestea generată automat nu a fost disponibilă acum, orașul \
         continuă să-ți ofere un arc de momente, culori și emoții.\n\
         Data viitoare, povestea ta va fi și mai bogată, pentru că Timișoara \
         știe întotdeauna să surprindă.",
        list
    )
}
