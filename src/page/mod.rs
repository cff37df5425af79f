pub mod document;
pub mod html;
pub mod surface;
pub mod watcher;

pub use html::HtmlPageSource;
pub use surface::InlineStyleSurface;
pub use watcher::DomWatcher;
