pub mod decode;
pub mod describe;
pub mod dispatcher;
pub mod workers;

pub use describe::ImageDescriber;
pub use dispatcher::{DispatchOutcome, DispatchSettings, Dispatcher, Pacing};
pub use workers::ConversationWorkers;
