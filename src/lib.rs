pub mod amount;
pub mod config;
pub mod connectivity;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod output;
pub mod report;
pub mod sheets;
pub mod stats;
pub mod store;
pub mod sync;
