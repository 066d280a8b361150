pub mod clock;
pub mod config;
pub mod display;
pub mod due;
pub mod error;
pub mod model;
pub mod notify;
pub mod scheduler;
pub mod storage;
pub mod store;

pub use store::{MutationOutcome, SharedStore, StoreEvent, StorePolicy, TaskStore};
