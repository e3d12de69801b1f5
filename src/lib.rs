pub mod config;
pub mod error;
pub mod mailer;
pub mod models;
pub mod openapi;
pub mod otp;
pub mod routes;
pub mod store; // in-memory OTP records

// Re-export commonly used items for tests / external users
pub use config::AppConfig;
pub use otp::OtpService;
pub use routes::{config, AppState};
