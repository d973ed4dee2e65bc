//! Google Cloud Vision OCR and OCR-driven post-processing

use crate::providers::chat::truncate;
use crate::types::{with_cancel, MenuImage, ProviderError};
use menulens_common::RawDish;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const VISION_URL: &str = "https://vision.googleapis.com/v1/images:annotate";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloud Vision `TEXT_DETECTION` client
#[derive(Debug, Clone)]
pub struct CloudVisionOcr {
    http_client: Client,
    api_key: Option<String>,
}

impl CloudVisionOcr {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Full text of the image
    ///
    /// # Errors
    /// Blank OCR output is `EmptyResult`; callers fall back to another
    /// extraction provider.
    pub async fn extract_text(
        &self,
        image: &MenuImage,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured("Cloud Vision API key".to_string())
        })?;

        let body = json!({
            "requests": [{
                "image": { "content": image.base64() },
                "features": [{ "type": "TEXT_DETECTION" }],
            }],
        });

        let started = Instant::now();
        let text = with_cancel(cancel, async {
            let response = self
                .http_client
                .post(VISION_URL)
                .query(&[("key", api_key)])
                .json(&body)
                .send()
                .await
                .map_err(|e| ProviderError::Network(format!("Cloud Vision request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                warn!(status = status.as_u16(), "Cloud Vision OCR failed");
                return Err(ProviderError::Api {
                    status: status.as_u16(),
                    message: truncate(&text, 300),
                });
            }

            let annotated: AnnotateResponse = response.json().await.map_err(|e| {
                ProviderError::Parse(format!("Cloud Vision response unreadable: {}", e))
            })?;

            Ok(annotated
                .responses
                .into_iter()
                .next()
                .and_then(|r| r.full_text_annotation)
                .map(|a| a.text)
                .unwrap_or_default())
        })
        .await?;

        debug!(
            chars = text.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Cloud Vision OCR OK"
        );

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResult);
        }
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateResult {
    full_text_annotation: Option<FullTextAnnotation>,
}

#[derive(Debug, Deserialize)]
struct FullTextAnnotation {
    #[serde(default)]
    text: String,
}

/// Recover native-script names the text model dropped
///
/// Text models sometimes return an empty `nameLocal` for non-Latin scripts.
/// For each such dish, the first OCR line that carries non-ASCII text and
/// either contains the dish's price or contains its English name (compared
/// without case or whitespace, names longer than 3 characters only) supplies
/// the missing name.
pub fn backfill_name_local(dishes: Vec<RawDish>, ocr_text: &str) -> Vec<RawDish> {
    dishes
        .into_iter()
        .map(|mut dish| {
            if dish.name_local.trim().is_empty() {
                if let Some(local) = find_local_name(&dish, ocr_text) {
                    dish.name_local = local;
                }
            }
            dish
        })
        .collect()
}

fn find_local_name(dish: &RawDish, ocr_text: &str) -> Option<String> {
    let english_key = squash_lower(&dish.name_english);
    let price = dish.price.trim();

    for line in ocr_text.lines() {
        let runs = non_ascii_runs(line);
        if runs.is_empty() {
            continue;
        }

        let has_price = !price.is_empty() && line.contains(price);
        let ascii_part: String = line.chars().filter(char::is_ascii).collect();
        let has_name = english_key.chars().count() > 3 && squash_lower(&ascii_part).contains(&english_key);

        if has_price || has_name {
            return Some(runs.join(" "));
        }
    }
    None
}

/// Runs of non-ASCII text, with inner whitespace kept between words
fn non_ascii_runs(line: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();
    let mut gap = String::new();

    for c in line.chars() {
        if !c.is_ascii() && !c.is_whitespace() {
            if !current.is_empty() {
                current.push_str(&gap);
            }
            gap.clear();
            current.push(c);
        } else if c.is_whitespace() && !current.is_empty() {
            gap.push(c);
        } else {
            if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
            gap.clear();
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

fn squash_lower(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name_english: &str, price: &str) -> RawDish {
        RawDish {
            id: "dish-1".into(),
            name_english: name_english.into(),
            price: price.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_backfill_by_price() {
        let ocr = "MENU\n김치 찌개 9,000\n된장찌개 8,000";
        let dishes = backfill_name_local(vec![raw("Kimchi Stew", "9,000")], ocr);
        assert_eq!(dishes[0].name_local, "김치 찌개");
    }

    #[test]
    fn test_backfill_by_english_name() {
        let ocr = "Pad Thai ผัดไทย\nTom Yum ต้มยำ";
        let dishes = backfill_name_local(vec![raw("Tom Yum", "")], ocr);
        assert_eq!(dishes[0].name_local, "ต้มยำ");
    }

    #[test]
    fn test_backfill_keeps_existing_and_short_names() {
        let ocr = "Pho phở bò";
        let mut existing = raw("Tom Yum", "");
        existing.name_local = "ต้มยำ".into();

        let dishes = backfill_name_local(vec![existing, raw("Pho", "")], ocr);

        assert_eq!(dishes[0].name_local, "ต้มยำ");
        assert_eq!(dishes[1].name_local, "", "3-char names never match by name");
    }

    #[test]
    fn test_non_ascii_runs_split_on_ascii() {
        assert_eq!(non_ascii_runs("ก ข 12 ค"), vec!["ก ข".to_string(), "ค".to_string()]);
        assert!(non_ascii_runs("plain ascii").is_empty());
    }
}
