pub mod dry_run;
pub mod error;
pub mod history;
pub mod names;
pub mod transport;
pub mod types;

pub use dry_run::DryRunTransport;
pub use error::TransportError;
pub use history::{HistorySource, MemoryHistory, RowSource, StoredHistory};
pub use names::{CachedResolver, Directory, DirectoryResolver, DisplayNameResolver, StaticDirectory};
pub use transport::Transport;
pub use types::{MessageKind, MessageType, NormalizedMessage, RawMessage};
