pub mod admission;
pub mod backoff;
pub mod processor;
pub mod queue;

use std::sync::Arc;

use anyhow::Result;

use crate::{
    classifier::Classifier,
    config::PipelineConfig,
    db::{settings::SettingsRepository, stats::StatsRecorder},
    domain::Candidate,
    page::surface::VisualSurface,
};

use self::{
    admission::AdmissionFilter, backoff::BackoffController, processor::ScanWorker,
    queue::ScanQueue,
};

/// Per-page pipeline state. Built when a page loads and dropped with it; the
/// filter goes to the watcher and the worker is spawned on its own task.
pub struct ScanPipeline {
    pub filter: AdmissionFilter,
    pub worker: ScanWorker,
    pub queue: Arc<ScanQueue<Candidate>>,
}

impl ScanPipeline {
    pub fn new(
        config: &PipelineConfig,
        classifier: Arc<dyn Classifier>,
        surface: Arc<dyn VisualSurface>,
        stats: Arc<dyn StatsRecorder>,
    ) -> Self {
        let queue = Arc::new(ScanQueue::new());
        let filter = AdmissionFilter::new(config.min_image_size, queue.clone(), surface.clone());
        let worker = ScanWorker::new(
            queue.clone(),
            classifier,
            surface,
            stats,
            BackoffController::from_config(config),
        );
        Self {
            filter,
            worker,
            queue,
        }
    }

    /// Builds the pipeline for a page load, or `None` when protection is
    /// paused. The flag is read once; a toggle applies to the next load.
    pub async fn for_page(
        settings: &SettingsRepository,
        config: &PipelineConfig,
        classifier: Arc<dyn Classifier>,
        surface: Arc<dyn VisualSurface>,
        stats: Arc<dyn StatsRecorder>,
    ) -> Result<Option<Self>> {
        if !settings.protection_enabled().await? {
            return Ok(None);
        }
        Ok(Some(Self::new(config, classifier, surface, stats)))
    }
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        db::{memory_pool, stats::StatsRepository},
        domain::{ClassifyError, ImageElement, Verdict},
        page::surface::InlineStyleSurface,
    };

    struct AlwaysSafe;

    impl Classifier for AlwaysSafe {
        fn classify<'a>(
            &'a self,
            _image: &'a ImageElement,
        ) -> BoxFuture<'a, Result<Verdict, ClassifyError>> {
            Box::pin(async { Ok(Verdict::Safe) })
        }
    }

    async fn pipeline_for(settings: &SettingsRepository) -> Option<ScanPipeline> {
        let stats = Arc::new(StatsRepository::new(memory_pool().await));
        ScanPipeline::for_page(
            settings,
            &PipelineConfig::default(),
            Arc::new(AlwaysSafe),
            Arc::new(InlineStyleSurface),
            stats,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn paused_protection_builds_no_pipeline() {
        let settings = SettingsRepository::new(memory_pool().await);
        settings.set_protection_enabled(false).await.unwrap();

        assert!(pipeline_for(&settings).await.is_none());
    }

    #[tokio::test]
    async fn active_protection_admits_images() {
        let settings = SettingsRepository::new(memory_pool().await);
        let mut pipeline = pipeline_for(&settings).await.expect("protection defaults to on");

        let img = ImageElement::new("https://cdn.example/a.jpg", 300, 300);
        pipeline.filter.admit(img);
        assert_eq!(pipeline.queue.len(), 1);

        settings.set_protection_enabled(false).await.unwrap();
        assert!(pipeline_for(&settings).await.is_none());
    }
}
