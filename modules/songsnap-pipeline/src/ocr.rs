//! Text detection through the Google Cloud Vision REST API.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use crate::traits::{BlobStore, ImageRef, TextDetector};

const BASE_URL: &str = "https://vision.googleapis.com/v1";

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    error: Option<VisionStatus>,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct VisionStatus {
    #[serde(default)]
    message: String,
}

/// Reads the image through the `BlobStore` and sends its bytes inline.
pub struct VisionTextDetector {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    store: Arc<dyn BlobStore>,
}

impl VisionTextDetector {
    pub fn new(api_key: String, store: Arc<dyn BlobStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: BASE_URL.to_string(),
            api_key,
            store,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// The first annotation holds the whole block of text; the rest are
/// individual words.
fn full_text(response: AnnotateResponse) -> Result<String> {
    let image = response.responses.into_iter().next().unwrap_or_default();
    if let Some(status) = image.error {
        bail!("Vision API rejected the image: {}", status.message);
    }
    Ok(image
        .text_annotations
        .into_iter()
        .next()
        .map(|a| a.description)
        .unwrap_or_default())
}

#[async_trait]
impl TextDetector for VisionTextDetector {
    async fn detect_text(&self, image: &ImageRef) -> Result<String> {
        tracing::info!(bucket = %image.bucket, name = %image.name, "Looking for text in image");

        let bytes = self.store.read(&image.bucket, &image.name).await?;
        let body = json!({
            "requests": [{
                "image": { "content": STANDARD.encode(&bytes) },
                "features": [{ "type": "TEXT_DETECTION" }],
            }]
        });

        let url = format!("{}/images:annotate", self.base_url);
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .context("calling Vision API")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Vision API returned {status}: {body}");
        }

        let text = full_text(resp.json().await?)?;
        tracing::info!(name = %image.name, chars = text.len(), "Extracted text from image");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> AnnotateResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn first_annotation_is_the_full_text() {
        let resp = parse(
            r#"{"responses": [{"textAnnotations": [
                {"locale": "en", "description": "FM1\nBoston (FM)\nMore Than a Feeling\n"},
                {"description": "FM1"},
                {"description": "Boston"}
            ]}]}"#,
        );
        assert_eq!(
            full_text(resp).unwrap(),
            "FM1\nBoston (FM)\nMore Than a Feeling\n"
        );
    }

    #[test]
    fn no_text_yields_empty_string() {
        assert_eq!(full_text(parse(r#"{"responses": [{}]}"#)).unwrap(), "");
        assert_eq!(full_text(parse(r#"{}"#)).unwrap(), "");
    }

    #[test]
    fn per_image_error_is_surfaced() {
        let resp = parse(r#"{"responses": [{"error": {"code": 3, "message": "Bad image data."}}]}"#);
        let err = full_text(resp).unwrap_err();
        assert!(err.to_string().contains("Bad image data."));
    }
}
