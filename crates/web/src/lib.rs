//! loginlab Web
//!
//! Serves the login form, the post-login dashboard and the JSON login API.

pub mod config;
pub mod server;
pub mod views;

pub use config::WebServerConfig;
pub use server::WebServer;
pub use views::Views;
