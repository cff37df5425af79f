use crate::domain::ImageElement;

pub const PENDING_FILTER: &str = "blur(15px) grayscale(100%)";
pub const PENDING_TRANSITION: &str = "filter 0.5s";
pub const BLOCKED_BORDER: &str = "5px solid red";

/// Where verdicts become visible on the page.
pub trait VisualSurface: Send + Sync {
    fn mark_pending(&self, image: &ImageElement);
    fn mark_clear(&self, image: &ImageElement);
    fn mark_blocked(&self, image: &ImageElement);
}

/// Writes the inline styles a browser would apply and logs each change.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineStyleSurface;

impl VisualSurface for InlineStyleSurface {
    fn mark_pending(&self, image: &ImageElement) {
        image.update_style(|style| {
            style.filter = Some(PENDING_FILTER.to_string());
            style.transition = Some(PENDING_TRANSITION.to_string());
        });
        tracing::trace!(target: "surface", src = image.src(), style = ?image.style(), "pending marker applied");
    }

    fn mark_clear(&self, image: &ImageElement) {
        image.update_style(|style| style.filter = None);
        tracing::info!(target: "surface", src = image.src(), "image cleared");
    }

    fn mark_blocked(&self, image: &ImageElement) {
        image.update_style(|style| style.border = Some(BLOCKED_BORDER.to_string()));
        tracing::warn!(target: "surface", src = image.src(), "image blocked");
    }
}
