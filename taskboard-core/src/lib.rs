pub mod bridge;
pub mod config;
pub mod drag;
pub mod mutation;
pub mod storage;
pub mod store;
pub mod sync;
pub mod types;
