pub mod adapters;
pub mod api;
pub mod config;
pub mod coordinator;
pub mod credentials;
pub mod data_models;
pub mod error;
pub mod fallback;
pub mod http;
pub mod money;
pub mod signer;
