pub mod manager;
pub mod normalize;
pub mod window;

pub use manager::ContextManager;
pub use normalize::normalize;
pub use window::{ContextWindow, HistoryRecord};
