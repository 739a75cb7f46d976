//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::path::PathBuf;

use arrrg_derive::CommandLine;

use crate::storage::FileStorage;

/// Thread used when none is given.
pub const DEFAULT_THREAD_ID: &str = "default";

/// Command-line arguments for the confidant-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the backend's HTTP API.
    #[arrrg(optional, "Backend API URL (default: $CONFIDANT_API_URL or http://localhost:8000/)", "URL")]
    pub api_url: Option<String>,

    /// URL of the chat WebSocket.
    #[arrrg(optional, "Chat WebSocket URL (default: $CONFIDANT_WS_URL or ws://localhost:8000/chat/ws/chat)", "URL")]
    pub ws_url: Option<String>,

    /// Where to keep the bearer token.
    #[arrrg(optional, "Token file (default: $CONFIDANT_TOKEN_FILE or ~/.confidant-token)", "PATH")]
    pub token_file: Option<String>,

    /// Conversation thread to join.
    #[arrrg(optional, "Conversation thread identifier (default: default)", "THREAD")]
    pub thread: Option<String>,

    /// Sign in with this email; the password is prompted for.
    #[arrrg(optional, "Sign in with this email (password is prompted)", "EMAIL")]
    pub signin: Option<String>,

    /// Create an account with this email; the password is prompted for.
    #[arrrg(optional, "Create an account with this email (password is prompted)", "EMAIL")]
    pub signup: Option<String>,

    /// Print the provider's sign-in URL and exit.
    #[arrrg(optional, "Print the OAuth sign-in URL for a provider (e.g. google) and exit", "PROVIDER")]
    pub oauth: Option<String>,

    /// Complete an OAuth sign-in from the URL the provider redirected to.
    #[arrrg(optional, "Complete OAuth sign-in from the callback URL", "URL")]
    pub oauth_callback: Option<String>,

    /// Forget the stored token and exit.
    #[arrrg(flag, "Sign out and exit")]
    pub signout: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// What the binary should do before (or instead of) chatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    /// Use whatever token is stored, prompting for sign-in if there is none.
    Resume,
    /// Sign in as this email.
    SignIn(String),
    /// Create an account for this email.
    SignUp(String),
    /// Print the OAuth URL for this provider and exit.
    OAuthUrl(String),
    /// Complete OAuth from this callback URL.
    OAuthCallback(String),
    /// Clear the stored token and exit.
    SignOut,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Backend API base URL; `None` defers to the client's env/default lookup.
    pub api_url: Option<String>,

    /// Chat WebSocket URL; `None` defers to the connector's env/default lookup.
    pub ws_url: Option<String>,

    /// Token file location.
    pub token_file: PathBuf,

    /// Conversation thread identifier.
    pub thread_id: String,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Authentication step requested on the command line.
    pub auth_action: AuthAction,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    pub fn new() -> Self {
        Self {
            api_url: None,
            ws_url: None,
            token_file: FileStorage::default_path(),
            thread_id: DEFAULT_THREAD_ID.to_string(),
            use_color: true,
            auth_action: AuthAction::Resume,
        }
    }

    /// Sets the backend API URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Sets the chat WebSocket URL.
    pub fn with_ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = Some(url.into());
        self
    }

    /// Sets the token file.
    pub fn with_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = path.into();
        self
    }

    /// Sets the thread identifier.
    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = thread_id.into();
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the authentication step.
    pub fn with_auth_action(mut self, action: AuthAction) -> Self {
        self.auth_action = action;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        // Sign-out wins; otherwise the first auth option given, in flag order.
        let auth_action = if args.signout {
            AuthAction::SignOut
        } else if let Some(email) = args.signin {
            AuthAction::SignIn(email)
        } else if let Some(email) = args.signup {
            AuthAction::SignUp(email)
        } else if let Some(provider) = args.oauth {
            AuthAction::OAuthUrl(provider)
        } else if let Some(callback) = args.oauth_callback {
            AuthAction::OAuthCallback(callback)
        } else {
            AuthAction::Resume
        };
        let token_file = args
            .token_file
            .map(PathBuf::from)
            .unwrap_or_else(FileStorage::default_path);

        ChatConfig {
            api_url: args.api_url,
            ws_url: args.ws_url,
            token_file,
            thread_id: args
                .thread
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_THREAD_ID.to_string()),
            use_color: !args.no_color,
            auth_action,
        }
    }
}
