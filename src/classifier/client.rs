use futures::future::BoxFuture;
use reqwest::{header::CONTENT_TYPE, Client};

use crate::{
    config::ClassifierConfig,
    domain::{ClassifyError, ImageElement, Verdict},
};

use super::{
    inference::{build_inline_request, build_url_request, check_status, parse_verdict, AnalyzeRequest},
    Classifier,
};

#[derive(Clone)]
pub struct SafeSurfClient {
    http: Client,
    config: ClassifierConfig,
}

impl SafeSurfClient {
    pub fn new(http: Client, config: ClassifierConfig) -> Self {
        Self { http, config }
    }

    pub async fn classify_image(&self, image: &ImageElement) -> Result<Verdict, ClassifyError> {
        let request = if self.config.inline_images {
            self.inline_request(image.src()).await?
        } else {
            build_url_request(image.src(), &self.config.default_mime_type)
        };

        let response = self
            .http
            .post(&self.config.endpoint)
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(ClassifyError::from_transport)?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(ClassifyError::from_transport)?;
        check_status(status, &body)?;

        let (verdict, payload) = parse_verdict(&body)?;
        tracing::debug!(
            target: "classifier",
            src = image.src(),
            ?verdict,
            is_safe = ?payload.is_safe,
            confidence = ?payload.confidence,
            "verdict received"
        );
        Ok(verdict)
    }

    async fn inline_request(&self, src: &str) -> Result<AnalyzeRequest, ClassifyError> {
        let response = self
            .http
            .get(src)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|err| ClassifyError::DownloadFailed(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ClassifyError::DownloadFailed(format!(
                "{} returned {}",
                src,
                response.status()
            )));
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.config.default_mime_type.clone());

        let bytes = response
            .bytes()
            .await
            .map_err(|err| ClassifyError::DownloadFailed(err.to_string()))?;
        Ok(build_inline_request(&bytes, &mime_type))
    }
}

impl Classifier for SafeSurfClient {
    fn classify<'a>(
        &'a self,
        image: &'a ImageElement,
    ) -> BoxFuture<'a, Result<Verdict, ClassifyError>> {
        Box::pin(self.classify_image(image))
    }
}
