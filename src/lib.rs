//! Portal Client - Resilient API Transport & Session Authentication
//!
//! The session layer for the player portal:
//! - A single HTTP funnel that normalizes every network/protocol failure
//!   into a closed five-code taxonomy
//! - A start-up bootstrapper that distinguishes "the backend is temporarily
//!   down" from "this credential is invalid"
//! - Narrow auth handlers (login, register, portal-token validation, logout)
//!   that settle the session through well-defined outcomes only
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │             SessionManager               │
//! │   (bootstrap + auth action handlers)     │
//! └───────────┬─────────────────┬────────────┘
//!             │                 │
//!             ▼                 ▼
//! ┌─────────────────┐   ┌─────────────────┐
//! │    Transport    │   │ CredentialStore │
//! │ (bearer inject, │   │ (token + user   │
//! │  ApiError funnel)│  │  pair, durable) │
//! └─────────────────┘   └─────────────────┘
//! ```

pub mod config;
pub mod credentials;
pub mod error;
pub mod session;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use config::ClientConfig;
pub use credentials::{
    CredentialStore, CredentialStoreError, FileCredentialStore, MemoryCredentialStore,
};
pub use error::{extract_message, ApiError, ErrorCode};
pub use session::{BootstrapOutcome, SessionManager, SessionState};
pub use transport::Transport;
pub use types::{AuthResponse, LoginOutcome, RegisterRequest, UserSummary, ValidateResponse};
