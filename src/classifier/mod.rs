mod client;
pub mod inference;

use futures::future::BoxFuture;

use crate::domain::{ClassifyError, ImageElement, Verdict};

pub use client::SafeSurfClient;

/// Boundary to the remote verdict service. One call is one classification attempt.
pub trait Classifier: Send + Sync {
    fn classify<'a>(
        &'a self,
        image: &'a ImageElement,
    ) -> BoxFuture<'a, Result<Verdict, ClassifyError>>;
}
