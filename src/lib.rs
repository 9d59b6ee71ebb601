pub mod cache;
pub mod client;
pub mod cloudflare_api;
pub mod config;
pub mod constants;
pub mod controller;
pub mod credentials;
pub mod dispatcher;
pub mod error;
pub mod frontend;
pub mod menu;
pub mod public_ip;
pub mod record_edit;
