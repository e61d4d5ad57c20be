pub mod config;
pub mod data_source;
pub mod events;
pub mod export;
pub mod fields;
pub mod http_client;
pub mod labels;
pub mod markets;
