pub mod candidate;
pub mod types;

pub use candidate::{Candidate, ImageElement, VisualState};
pub use types::{ClassifyError, ErrorKind, QueueSnapshot, Verdict};
