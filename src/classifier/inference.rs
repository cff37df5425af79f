use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::domain::{ClassifyError, Verdict};

/// Body of `POST /api/analyze-image`. Exactly one of `image` / `image_url` is set.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub mime_type: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeResponse {
    pub result: Option<VerdictPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictPayload {
    pub is_safe: Option<bool>,
    pub confidence: Option<f64>,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Safe,
    Block,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub fn build_url_request(image_url: &str, mime_type: &str) -> AnalyzeRequest {
    AnalyzeRequest {
        image: None,
        image_url: Some(image_url.to_string()),
        mime_type: mime_type.to_string(),
    }
}

pub fn build_inline_request(bytes: &[u8], mime_type: &str) -> AnalyzeRequest {
    AnalyzeRequest {
        image: Some(STANDARD.encode(bytes)),
        image_url: None,
        mime_type: mime_type.to_string(),
    }
}

/// Maps the service's HTTP status onto the error taxonomy before the body is parsed.
pub fn check_status(status: StatusCode, body: &[u8]) -> Result<(), ClassifyError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ClassifyError::RateLimited);
    }
    if status.is_success() {
        return Ok(());
    }
    // the proxy answers 400 when it could not fetch the image source itself
    if status == StatusCode::BAD_REQUEST {
        if let Ok(body) = serde_json::from_slice::<ErrorBody>(body) {
            if body.error.to_ascii_lowercase().contains("download") {
                return Err(ClassifyError::DownloadFailed(body.error));
            }
        }
    }
    Err(ClassifyError::Status(status.as_u16()))
}

pub fn parse_verdict(body: &[u8]) -> Result<(Verdict, VerdictPayload), ClassifyError> {
    let response: AnalyzeResponse = serde_json::from_slice(body)
        .map_err(|err| ClassifyError::Malformed(err.to_string()))?;
    let payload = response
        .result
        .ok_or_else(|| ClassifyError::Malformed("response missing result".into()))?;

    let verdict = match payload.recommendation {
        Recommendation::Safe => Verdict::Safe,
        Recommendation::Block => Verdict::Unsafe,
    };
    Ok((verdict, payload))
}
