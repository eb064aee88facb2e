//! Generation API provider
//!
//! Each page is produced in two steps. A text model is asked for structured
//! descriptions of plausible case images, then an image model renders each
//! description. Renders are requested one at a time; a failed render drops
//! that image and the page continues with the rest.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::ImageSourceProvider;
use crate::config::GenerativeConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::pacing::Pacer;
use crate::types::{GeneratedImage, ImageRecord, Language, ProviderPage, SearchFilters, SearchTerm};

/// Most descriptions requested from the text model at once
pub const MAX_PAGE_SIZE: usize = 25;

const IMAGE_PROMPT_SUFFIX: &str = "photorealistic, documentary style";
const IMAGE_MIME_TYPE: &str = "image/jpeg";
const IMAGE_ASPECT_RATIO: &str = "4:3";

/// Text-then-image generation provider
pub struct GenerativeProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    text_model: String,
    image_model: String,
    page_size: usize,
    pacer: Arc<dyn Pacer>,
}

impl GenerativeProvider {
    pub fn new(client: Client, config: &GenerativeConfig, pacer: Arc<dyn Pacer>) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            page_size: config.page_size.clamp(1, MAX_PAGE_SIZE),
            pacer,
        }
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.endpoint, model, method)
    }

    /// Step 1: ask the text model for `count` image descriptions
    async fn describe(
        &self,
        term: &SearchTerm,
        language: Language,
        count: usize,
    ) -> ProviderResult<Vec<Description>> {
        let body = json!({
            "contents": [{ "parts": [{ "text": description_prompt(term, language, count) }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": description_schema(),
            }
        });

        let response = self
            .client
            .post(self.model_url(&self.text_model, "generateContent"))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let parsed: GenerateContentResponse = read_json(response).await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| ProviderError::Malformed("text model returned no content".into()))?;

        let descriptions: DescriptionList = serde_json::from_str(text.trim())?;
        Ok(descriptions.images)
    }

    /// Step 2: render one description, returning `(mime type, base64 bytes)`
    async fn render(&self, description: &str) -> ProviderResult<(String, String)> {
        let body = json!({
            "instances": [{ "prompt": format!("{}, {}", description, IMAGE_PROMPT_SUFFIX) }],
            "parameters": {
                "sampleCount": 1,
                "aspectRatio": IMAGE_ASPECT_RATIO,
                "outputOptions": { "mimeType": IMAGE_MIME_TYPE },
            }
        });

        let response = self
            .client
            .post(self.model_url(&self.image_model, "predict"))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let parsed: PredictResponse = read_json(response).await?;
        parsed
            .predictions
            .into_iter()
            .find_map(|p| {
                p.bytes_base64_encoded.map(|bytes| {
                    (p.mime_type.unwrap_or_else(|| IMAGE_MIME_TYPE.to_string()), bytes)
                })
            })
            .ok_or_else(|| ProviderError::Malformed("image model returned no image".into()))
    }
}

// API request/response types
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DescriptionList {
    images: Vec<Description>,
}

/// One generated description, as the text model returns it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Description {
    description: String,
    image_type: String,
    source: String,
    year: i32,
    generated_filename: String,
    source_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> ProviderResult<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .and_then(|e| e.error)
            .and_then(|e| e.message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });
        return Err(ProviderError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_str(&body)?)
}

/// Quote and backtick characters are escaped before the name enters a prompt
fn escape_name(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        if c == '"' || c == '`' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn description_prompt(term: &SearchTerm, language: Language, count: usize) -> String {
    let name = escape_name(term.as_str());
    format!(
        r#"You are an expert criminal archivist. Generate metadata for plausible images related to a criminal case.

Input Name: "{name}"
Language for descriptions: {language}
Number of images to find: {count}

Instructions:
1. Cover a variety of images related to the case: mugshots, courtroom sketches or photos, arrest photos, evidence, relevant locations and newspaper headlines.
2. Avoid graphic content, images of victims, memes and sensationalism.
3. 'description' must be a journalistic description detailed enough to prompt an image generator for a photorealistic result.
4. Do not use the name "{name}" in 'description'. Refer to the person with generic terms such as 'the defendant' or 'the suspect'.
5. 'generatedFilename' has the form [name_in_snake_case]_[imageType]_[source_in_snake_case]_[year].jpg
6. 'sourceUrl' is a plausible-looking but fake source URL.

Return a JSON object with a single key "images" and no text outside the JSON."#,
        name = name,
        language = language.display_name(),
        count = count,
    )
}

fn description_schema() -> serde_json::Value {
    let string = json!({ "type": "STRING" });
    json!({
        "type": "OBJECT",
        "properties": {
            "images": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "description": string,
                        "imageType": string,
                        "source": string,
                        "year": { "type": "INTEGER" },
                        "generatedFilename": string,
                        "sourceUrl": string,
                    },
                    "required": [
                        "description", "imageType", "source",
                        "year", "generatedFilename", "sourceUrl"
                    ]
                }
            }
        },
        "required": ["images"]
    })
}

fn to_record(
    term: &SearchTerm,
    absolute_index: usize,
    description: Description,
    mime_type: &str,
    base64_bytes: &str,
) -> ImageRecord {
    ImageRecord {
        id: ImageRecord::make_id(term, absolute_index),
        image_url: format!("data:{};base64,{}", mime_type, base64_bytes),
        title: Some(description.description.clone()),
        source: Some(description.source),
        article_url: Some(description.source_url),
        width: None,
        height: None,
        thumbnail_url: None,
        generated: Some(GeneratedImage {
            description: description.description,
            image_type: description.image_type,
            year: description.year,
            generated_filename: description.generated_filename,
        }),
    }
}

#[async_trait]
impl ImageSourceProvider for GenerativeProvider {
    fn name(&self) -> &str {
        "generative"
    }

    fn max_page_size(&self) -> usize {
        self.page_size
    }

    fn missing_credential(&self) -> Option<&'static str> {
        if self.api_key.trim().is_empty() {
            Some("generation API key")
        } else {
            None
        }
    }

    #[instrument(skip(self, filters), fields(term = %term))]
    async fn fetch_page(
        &self,
        term: &SearchTerm,
        start_index: usize,
        page_size: usize,
        filters: &SearchFilters,
    ) -> ProviderResult<ProviderPage> {
        let count = page_size.clamp(1, self.page_size);
        let mut descriptions = self.describe(term, filters.language, count).await?;
        info!("Generated {} descriptions", descriptions.len());
        if descriptions.len() > count {
            debug!(extra = descriptions.len() - count, "dropping descriptions beyond the page");
            descriptions.truncate(count);
        }

        let mut images = Vec::with_capacity(descriptions.len());

        for (i, description) in descriptions.into_iter().enumerate() {
            if i > 0 {
                self.pacer.pause().await;
            }
            match self.render(&description.description).await {
                Ok((mime_type, bytes)) => {
                    let index = start_index.max(1) + images.len();
                    images.push(to_record(term, index, description, &mime_type, &bytes));
                }
                Err(e) => warn!(error = %e, "Skipping image that failed to render"),
            }
        }

        debug!(count = images.len(), "rendered images");

        Ok(ProviderPage {
            images,
            total_results: None,
        })
    }
}
