use std::sync::Arc;

use parking_lot::Mutex;

/// A queued image is a shared handle to the page's element; the page owns it.
pub type Candidate = Arc<ImageElement>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualState {
    Pending,
    Clear,
    Blocked,
}

/// Inline style properties the guard touches on an image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementStyle {
    pub filter: Option<String>,
    pub transition: Option<String>,
    pub border: Option<String>,
}

#[derive(Debug)]
pub struct ImageElement {
    src: String,
    width: Option<u32>,
    height: Option<u32>,
    style: Mutex<ElementStyle>,
}

impl ImageElement {
    pub fn new(src: impl Into<String>, width: u32, height: u32) -> Candidate {
        Self::with_dimensions(src, Some(width), Some(height))
    }

    /// `None` means the page gave no usable size for that axis.
    pub fn with_dimensions(
        src: impl Into<String>,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Candidate {
        Arc::new(Self {
            src: src.into(),
            width,
            height,
            style: Mutex::new(ElementStyle::default()),
        })
    }

    /// Source URL; doubles as the identity key for deduplication.
    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn width(&self) -> Option<u32> {
        self.width
    }

    pub fn height(&self) -> Option<u32> {
        self.height
    }

    /// True when a known dimension is smaller than `min`. Unknown axes pass.
    pub fn is_smaller_than(&self, min: u32) -> bool {
        [self.width, self.height]
            .into_iter()
            .flatten()
            .any(|side| side < min)
    }

    pub fn style(&self) -> ElementStyle {
        self.style.lock().clone()
    }

    pub fn update_style(&self, apply: impl FnOnce(&mut ElementStyle)) {
        apply(&mut self.style.lock());
    }

    pub fn visual_state(&self) -> VisualState {
        let style = self.style.lock();
        if style.border.is_some() {
            VisualState::Blocked
        } else if style.filter.is_some() {
            VisualState::Pending
        } else {
            VisualState::Clear
        }
    }
}
