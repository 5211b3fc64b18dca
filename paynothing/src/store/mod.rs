//! Backing store collaborators.

mod file;
mod firestore;
mod memory;
mod polling;
mod traits;

pub use file::FileStore;
pub use memory::{Fixture, MemoryStore};
pub use polling::PollingFeed;
pub use traits::{MessageFeed, MessageSink, ProfileLookup, SnapshotSource, Subscription};
