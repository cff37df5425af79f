use std::{collections::HashSet, sync::Arc};

use crate::{
    domain::{Candidate, QueueSnapshot},
    page::surface::VisualSurface,
};

use super::queue::ScanQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    TooSmall,
    AlreadySeen,
}

/// One-time gate in front of the scan queue. Keys stay in `processed` for the
/// life of the page, so an image is never queued twice even after it was dropped.
pub struct AdmissionFilter {
    min_size: u32,
    processed: HashSet<String>,
    queue: Arc<ScanQueue<Candidate>>,
    surface: Arc<dyn VisualSurface>,
}

impl AdmissionFilter {
    pub fn new(
        min_size: u32,
        queue: Arc<ScanQueue<Candidate>>,
        surface: Arc<dyn VisualSurface>,
    ) -> Self {
        Self {
            min_size,
            processed: HashSet::new(),
            queue,
            surface,
        }
    }

    pub fn admit(&mut self, candidate: Candidate) -> Admission {
        if candidate.is_smaller_than(self.min_size) {
            tracing::trace!(
                target: "admission",
                src = candidate.src(),
                width = ?candidate.width(),
                height = ?candidate.height(),
                "image below size threshold"
            );
            return Admission::TooSmall;
        }
        if !self.processed.insert(candidate.src().to_string()) {
            return Admission::AlreadySeen;
        }

        self.surface.mark_pending(&candidate);
        self.queue.push(candidate.clone());
        tracing::debug!(
            target: "admission",
            src = candidate.src(),
            queued = self.queue.len(),
            "image queued for classification"
        );
        Admission::Admitted
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            queued: self.queue.len(),
            admitted: self.processed.len(),
        }
    }
}
