pub mod access_control;
pub mod config;
pub mod error;
pub mod hosting;
pub mod inbound;
pub mod logging;
pub mod models;
pub mod proxy;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use proxy::{ProxyHandler, ProxyResponse};
