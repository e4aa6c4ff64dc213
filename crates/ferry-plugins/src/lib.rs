pub mod cadence;
pub mod chat;
pub mod echo;
pub mod error;
pub mod plugin;
pub mod registry;
pub mod stop;

pub use cadence::CadenceGate;
pub use chat::ChatPlugin;
pub use echo::{EchoPlugin, RepeatDetector};
pub use error::PluginError;
pub use plugin::{Plugin, PluginReply, Turn};
pub use registry::PluginRegistry;
pub use stop::StopPlugin;
