//! Interactive chat with the Confidant companion backend.
//!
//! This binary signs in (or resumes a stored session), opens the chat
//! WebSocket for a conversation thread, and runs a REPL over it.
//!
//! # Usage
//!
//! ```bash
//! # Resume the stored session, prompting for sign-in if there is none
//! confidant-chat
//!
//! # Sign in, then chat on the "journal" thread
//! confidant-chat --signin me@example.com --thread journal
//!
//! # Two-step OAuth: print the provider URL, then paste the redirect back
//! confidant-chat --oauth google
//! confidant-chat --oauth-callback 'http://localhost:3000/#access_token=...'
//!
//! # Forget the stored token
//! confidant-chat --signout
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/thread <id>` - Reconnect on another thread
//! - `/reconnect` - Open a fresh connection
//! - `/history` - Reprint the conversation
//! - `/status` - Show connection and sign-in status
//! - `/signout` - Forget the stored token and exit
//! - `/quit` - Exit the application

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

use confidant::chat::{
    AuthAction, ChatArgs, ChatCommand, ChatConfig, ChatEvent, ChatSession, PlainTextRenderer,
    Renderer, SubmitOutcome, WebSocketConnector, help_text, parse_command,
};
use confidant::{
    AuthClient, AuthGateway, CallbackOutcome, ConnectionState, FileStorage, RestoreOutcome,
    SessionStore, handle_callback,
};

/// Main entry point for the confidant-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("confidant-chat [OPTIONS]");
    let config = ChatConfig::from(args);

    let client = AuthClient::new(config.api_url.clone())?;
    let mut store = SessionStore::load(FileStorage::new(config.token_file.clone()))?;
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut rl = DefaultEditor::new()?;

    match &config.auth_action {
        AuthAction::SignOut => {
            store.clear()?;
            renderer.print_info("Signed out.");
            return Ok(());
        }
        AuthAction::OAuthUrl(provider) => {
            let url = client.get_oauth_redirect_url(provider).await?;
            println!("Open this URL to sign in with {provider}:");
            println!("{url}");
            println!("Then run: confidant-chat --oauth-callback '<redirect URL>'");
            return Ok(());
        }
        AuthAction::OAuthCallback(callback) => {
            match handle_callback(callback, &client, &mut store).await? {
                CallbackOutcome::SignedIn(email) => {
                    renderer.print_info(&format!("Signed in as {email}."));
                }
                CallbackOutcome::NoToken => {
                    renderer.print_error("the callback URL carried no access_token");
                    return Ok(());
                }
            }
        }
        AuthAction::SignIn(email) => {
            let password = rl.readline("Password: ")?;
            store.sign_in(&client, email, &password).await?;
            renderer.print_info(&format!("Signed in as {email}."));
        }
        AuthAction::SignUp(email) => {
            let password = rl.readline("Choose a password: ")?;
            store.sign_up(&client, email, &password).await?;
            renderer.print_info(&format!("Account created for {email}."));
        }
        AuthAction::Resume => match store.restore(&client).await? {
            RestoreOutcome::Authenticated(email) => {
                renderer.print_info(&format!("Welcome back, {email}."));
            }
            RestoreOutcome::Invalidated => {
                renderer.print_info("Your session has expired; please sign in again.");
            }
            RestoreOutcome::NoToken => {}
        },
    }

    if !store.is_authenticated() {
        prompt_sign_in(&mut rl, &client, &mut store, &mut renderer).await?;
    }
    let Some(token) = store.token().map(str::to_string) else {
        return Ok(());
    };

    let connector = WebSocketConnector::new(config.ws_url.clone())?;
    let mut session = ChatSession::new(connector);
    let mut thread_id = config.thread_id.clone();

    // Ctrl+C while waiting on a reply closes the connection instead of exiting.
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupt = Arc::new(Notify::new());
    let interrupted_clone = interrupted.clone();
    let interrupt_clone = interrupt.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
        interrupt_clone.notify_waiters();
    })?;

    connect(&mut session, &token, &thread_id, &mut renderer).await;

    println!("Confidant Chat (thread: {thread_id})");
    println!("Type /help for commands, /quit to exit\n");

    loop {
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");

        match readline {
            Ok(raw) => {
                let line = raw.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            session.close().await;
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Thread(next) => {
                            thread_id = next;
                            connect(&mut session, &token, &thread_id, &mut renderer).await;
                        }
                        ChatCommand::Reconnect => {
                            connect(&mut session, &token, &thread_id, &mut renderer).await;
                        }
                        ChatCommand::History => {
                            if session.messages().is_empty() {
                                renderer.print_info("No messages yet.");
                            }
                            for message in session.messages() {
                                renderer.print_message(message);
                            }
                        }
                        ChatCommand::Status => {
                            show_events(&mut session, &mut renderer);
                            println!("    Signed in as: {}", store.email().unwrap_or("(unknown)"));
                            println!("    Thread: {thread_id}");
                            println!("    Connection: {}", session.state());
                            println!("    Messages: {}", session.messages().len());
                        }
                        ChatCommand::SignOut => {
                            session.close().await;
                            store.clear()?;
                            renderer.print_info("Signed out.");
                            break;
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // A close that arrived while the prompt was up must land before the turn.
                show_events(&mut session, &mut renderer);
                match session.submit(&raw).await {
                    Ok(SubmitOutcome::Sent) => {}
                    Ok(SubmitOutcome::Rejected(rejected)) => {
                        renderer.print_error(&rejected.to_string());
                        if session.state() == ConnectionState::Closed {
                            renderer.print_info("Use /reconnect to open a new connection.");
                        }
                        continue;
                    }
                    Err(e) => {
                        renderer.print_error(&e.to_string());
                        continue;
                    }
                }

                renderer.print_pending();
                let replies = tokio::select! {
                    replies = session.wait_for_reply() => Some(replies),
                    _ = interrupt.notified() => None,
                };
                match replies {
                    Some(replies) => {
                        for message in &replies {
                            renderer.print_message(message);
                        }
                    }
                    None => {
                        if interrupted.load(Ordering::Relaxed) {
                            session.close().await;
                            if let Some(last) = session.messages().last() {
                                renderer.print_message(last);
                            }
                        }
                    }
                }
                if session.state() == ConnectionState::Closed {
                    renderer.print_info("Use /reconnect to open a new connection.");
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                session.close().await;
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// Ask for credentials until sign-in succeeds or the user gives up.
async fn prompt_sign_in(
    rl: &mut DefaultEditor,
    client: &AuthClient,
    store: &mut SessionStore<FileStorage>,
    renderer: &mut PlainTextRenderer,
) -> Result<(), Box<dyn std::error::Error>> {
    renderer.print_info("Sign in to continue (Ctrl+D to exit).");
    loop {
        let email = match rl.readline("Email: ") {
            Ok(email) => email.trim().to_string(),
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        if email.is_empty() {
            continue;
        }
        let password = match rl.readline("Password: ") {
            Ok(password) => password,
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        match store.sign_in(client, &email, &password).await {
            Ok(()) => {
                renderer.print_info(&format!("Signed in as {email}."));
                return Ok(());
            }
            Err(err) => renderer.print_error(&err.to_string()),
        }
    }
}

/// Open (or reopen) the connection, reporting failures in the transcript.
async fn connect(
    session: &mut ChatSession<WebSocketConnector>,
    token: &str,
    thread_id: &str,
    renderer: &mut PlainTextRenderer,
) {
    if let Err(err) = session.open(token, thread_id).await {
        if let Some(last) = session.messages().last() {
            renderer.print_message(last);
        }
        tracing::debug!(error = %err, "open failed");
        renderer.print_info("Use /reconnect to try again.");
        return;
    }
    show_events(session, renderer);
    if session.state() == ConnectionState::Open {
        renderer.print_info(&format!("Connected to thread {thread_id}."));
    }
}

/// Apply and print whatever arrived while the user was not waiting on a reply.
fn show_events(
    session: &mut ChatSession<WebSocketConnector>,
    renderer: &mut PlainTextRenderer,
) {
    for event in session.poll_events() {
        match event {
            ChatEvent::Message(message) => renderer.print_message(&message),
            ChatEvent::Ignored => {}
            ChatEvent::Closed(_) => {
                if let Some(last) = session.messages().last() {
                    renderer.print_message(last);
                }
                renderer.print_info("Use /reconnect to open a new connection.");
            }
        }
    }
}
