//! pdfchat
//!
//! Upload a PDF, keep its extracted text and tables under a session id, and
//! answer questions about it through a remote chat completions API.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use handlers::create_router;
pub use state::AppState;
