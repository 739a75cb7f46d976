// Public modules
pub mod auth;
pub mod connection_state;
pub mod frame;
pub mod message;

// Re-exports
pub use auth::{AuthResponse, Credentials, HealthResponse, OAuthRedirect, OAuthRequest, Profile};
pub use connection_state::ConnectionState;
pub use frame::{FrameKind, Handshake, InboundFrame, InputFrame, OutboundFrame};
pub use message::{Message, MessageMeta, Role};
