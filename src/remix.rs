use std::fmt;
use std::str::FromStr;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::meal::Recipe;

pub const FALLBACK_REMIX: &str = "Sorry, I couldn't remix this recipe.";
const SYSTEM_PROMPT: &str = "You are a helpful and creative chef assistant.";
const MAX_TOKENS: u32 = 400;
const TEMPERATURE: f32 = 0.8;

#[derive(Error, Debug)]
pub enum RemixError {
    #[error("no API key configured for the remix service")]
    MissingApiKey,

    #[error("request to the remix service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remix service answered with status {0}")]
    Status(StatusCode),

    #[error("could not decode the remix response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemixTheme {
    Vegan,
    GlutenFree,
    Spicy,
    KidFriendly,
    Gourmet,
    Budget,
    Quick,
    Fusion,
}

impl RemixTheme {
    pub const ALL: [RemixTheme; 8] = [
        RemixTheme::Vegan,
        RemixTheme::GlutenFree,
        RemixTheme::Spicy,
        RemixTheme::KidFriendly,
        RemixTheme::Gourmet,
        RemixTheme::Budget,
        RemixTheme::Quick,
        RemixTheme::Fusion,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            RemixTheme::Vegan => "vegan",
            RemixTheme::GlutenFree => "gluten-free",
            RemixTheme::Spicy => "spicy",
            RemixTheme::KidFriendly => "kid-friendly",
            RemixTheme::Gourmet => "gourmet",
            RemixTheme::Budget => "budget",
            RemixTheme::Quick => "quick",
            RemixTheme::Fusion => "fusion",
        }
    }

    /// The phrase placed in the prompt.
    pub fn phrase(self) -> &'static str {
        match self {
            RemixTheme::Vegan => "Make it vegan",
            RemixTheme::GlutenFree => "Make it gluten-free",
            RemixTheme::Spicy => "Turn up the heat and make it spicy",
            RemixTheme::KidFriendly => "Make it kid-friendly",
            RemixTheme::Gourmet => "Make it a fancy gourmet dish",
            RemixTheme::Budget => "Make it cheap and budget-friendly",
            RemixTheme::Quick => "Make it quick, under 20 minutes",
            RemixTheme::Fusion => "Give it a surprising cuisine fusion twist",
        }
    }
}

impl fmt::Display for RemixTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for RemixTheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace([' ', '_'], "-");
        RemixTheme::ALL
            .into_iter()
            .find(|theme| theme.slug() == wanted)
            .ok_or_else(|| format!("unknown remix theme {:?}", s.trim()))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Default, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    fn first_content(self) -> Option<String> {
        self.choices?.into_iter().next()?.message?.content
    }
}

pub fn build_prompt(recipe: &Recipe, theme: RemixTheme) -> Result<String, RemixError> {
    Ok(format!(
        "
You are a creative chef AI. Given this recipe (in JSON) and a remix theme, write a short, fun, creative, and doable remix of the recipe. Highlight any changed ingredients or instructions.

Remix theme: {}

Recipe JSON:
{}
",
        theme.phrase(),
        serde_json::to_string_pretty(recipe)?
    ))
}

/// Client for an OpenAI-compatible chat-completion endpoint.
#[derive(Clone)]
pub struct RemixClient {
    http: Client,
    base: String,
    api_key: Option<String>,
    model: String,
}

impl RemixClient {
    pub fn new(
        http: Client,
        base: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        RemixClient {
            http,
            base: base.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        }
    }

    /// Asks for a themed rewrite. A reply without a first choice's content
    /// yields [`FALLBACK_REMIX`] rather than an error.
    pub async fn remix(&self, recipe: &Recipe, theme: RemixTheme) -> Result<String, RemixError> {
        let api_key = self.api_key.as_deref().ok_or(RemixError::MissingApiKey)?;
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_prompt(recipe, theme)?,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        log::info!("Remixing {:?} as {}", recipe.name(), theme);
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemixError::Status(status));
        }
        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)?;
        Ok(parsed
            .first_content()
            .unwrap_or_else(|| FALLBACK_REMIX.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meal::recipe_from;
    use crate::test_support::{serve, FakeApi};
    use serde_json::{json, Value};

    fn soup() -> Recipe {
        recipe_from(json!({ "strMeal": "Tomato Soup", "strIngredient1": "Tomato" }))
    }

    #[test]
    fn themes_parse_from_loose_input() {
        assert_eq!("Gluten Free".parse::<RemixTheme>(), Ok(RemixTheme::GlutenFree));
        assert_eq!("kid_friendly".parse::<RemixTheme>(), Ok(RemixTheme::KidFriendly));
        assert!("pirate".parse::<RemixTheme>().is_err());
        for theme in RemixTheme::ALL {
            assert_eq!(theme.slug().parse::<RemixTheme>(), Ok(theme));
        }
    }

    #[test]
    fn prompt_embeds_theme_and_recipe_json() {
        let prompt = build_prompt(&soup(), RemixTheme::Spicy).unwrap();
        assert!(prompt.contains("Remix theme: Turn up the heat and make it spicy"));
        assert!(prompt.contains("\"strMeal\": \"Tomato Soup\""));
    }

    #[tokio::test]
    async fn sends_chat_request_with_bearer_key() {
        let fake = FakeApi::default();
        fake.respond(
            "/chat/completions",
            json!({ "choices": [{ "message": { "role": "assistant", "content": "Spicy soup!" } }] }),
        );
        let base = serve(fake.router()).await;
        let client = RemixClient::new(Client::new(), base, Some("sk-test".into()), "gpt-4.1");

        let text = client.remix(&soup(), RemixTheme::Spicy).await.unwrap();
        assert_eq!(text, "Spicy soup!");

        let hits = fake.hits();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].authorization.as_deref(), Some("Bearer sk-test"));
        let body: Value = serde_json::from_slice(&hits[0].body).unwrap();
        assert_eq!(body["model"], "gpt-4.1");
        assert_eq!(body["max_tokens"], 400);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(body["messages"][1]["role"], "user");
        assert!((body["temperature"].as_f64().unwrap() - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn missing_choices_fall_back() {
        let fake = FakeApi::default();
        fake.respond("/chat/completions", json!({ "id": "x" }));
        let base = serve(fake.router()).await;
        let client = RemixClient::new(Client::new(), base, Some("k".into()), "m");

        assert_eq!(client.remix(&soup(), RemixTheme::Vegan).await.unwrap(), FALLBACK_REMIX);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let fake = FakeApi::default();
        fake.fail("/chat/completions", 401);
        let base = serve(fake.router()).await;
        let client = RemixClient::new(Client::new(), base, Some("k".into()), "m");

        assert!(matches!(
            client.remix(&soup(), RemixTheme::Vegan).await,
            Err(RemixError::Status(StatusCode::UNAUTHORIZED))
        ));
    }

    #[tokio::test]
    async fn missing_key_issues_no_request() {
        let fake = FakeApi::default();
        let base = serve(fake.router()).await;
        let client = RemixClient::new(Client::new(), base, None, "m");

        assert!(matches!(
            client.remix(&soup(), RemixTheme::Vegan).await,
            Err(RemixError::MissingApiKey)
        ));
        assert!(fake.hits().is_empty());
    }
}
