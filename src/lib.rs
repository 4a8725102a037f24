pub mod client;
pub mod config;
pub mod error;
pub mod forecast;
pub mod routes;
pub mod utils;
