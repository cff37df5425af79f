use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    infrastructure::shutdown::ShutdownListener,
    tasks::admission::{Admission, AdmissionFilter},
};

use super::document::{DomNode, MutationBatch};

/// Forwards every image found in the document, then in each inserted
/// subtree, to the admission filter. Runs until the page goes away.
pub struct DomWatcher {
    filter: AdmissionFilter,
}

impl DomWatcher {
    pub fn new(filter: AdmissionFilter) -> Self {
        Self { filter }
    }

    /// Initial pass over images that existed before observation started.
    pub fn scan_document(&mut self, root: &DomNode) -> usize {
        self.forward(root)
    }

    pub fn handle_batch(&mut self, batch: MutationBatch) -> usize {
        batch
            .iter()
            .flat_map(|record| record.added_nodes.iter())
            .map(|node| self.forward(node))
            .sum()
    }

    pub async fn run(
        mut self,
        document: DomNode,
        mut mutations: UnboundedReceiver<MutationBatch>,
        mut shutdown: ShutdownListener,
    ) {
        let admitted = self.scan_document(&document);
        tracing::info!(target: "watcher", admitted, "initial document scan complete");

        loop {
            tokio::select! {
                batch = mutations.recv() => {
                    let Some(batch) = batch else { break };
                    let admitted = self.handle_batch(batch);
                    if admitted > 0 {
                        let snapshot = self.filter.snapshot();
                        tracing::debug!(
                            target: "watcher",
                            admitted,
                            queued = snapshot.queued,
                            total = snapshot.admitted,
                            "mutation batch handled"
                        );
                    }
                }
                _ = shutdown.notified() => break,
            }
        }

        let snapshot = self.filter.snapshot();
        tracing::info!(
            target: "watcher",
            queued = snapshot.queued,
            admitted = snapshot.admitted,
            "watcher stopped"
        );
    }

    fn forward(&mut self, node: &DomNode) -> usize {
        let images = node.images();
        let found = images.len();
        let admitted = images
            .into_iter()
            .filter(|image| self.filter.admit(image.clone()) == Admission::Admitted)
            .count();
        tracing::trace!(target: "watcher", node = node.tag(), found, admitted, "subtree scanned");
        admitted
    }
}
