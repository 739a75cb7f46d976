//! Integration tests for the Confidant client library.
//! These tests stand up throwaway HTTP and WebSocket servers on loopback.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    use confidant::chat::{ChatEvent, ChatSession, SubmitOutcome, SubmitRejected, WebSocketConnector};
    use confidant::{
        AuthClient, AuthGateway, CallbackOutcome, ConnectionState, MemoryStorage, RestoreOutcome,
        Role, SessionStore, handle_callback,
    };

    /// A parsed request: method, path, authorization header, and body.
    struct Request {
        method: String,
        path: String,
        authorization: Option<String>,
        body: String,
    }

    async fn read_request(stream: &mut TcpStream) -> Request {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client hung up mid-request");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let mut lines = head.lines();
        let mut request_line = lines.next().unwrap().split_whitespace();
        let method = request_line.next().unwrap().to_string();
        let path = request_line.next().unwrap().to_string();
        let mut content_length = 0;
        let mut authorization = None;
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                match name.trim().to_ascii_lowercase().as_str() {
                    "content-length" => content_length = value.trim().parse().unwrap(),
                    "authorization" => authorization = Some(value.trim().to_string()),
                    _ => {}
                }
            }
        }
        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client hung up mid-body");
            buf.extend_from_slice(&chunk[..n]);
        }
        let body = String::from_utf8_lossy(&buf[header_end..header_end + content_length]).to_string();
        Request {
            method,
            path,
            authorization,
            body,
        }
    }

    /// Serve a fake `/auth` backend until the test ends.
    async fn spawn_auth_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let request = read_request(&mut stream).await;
                    let (status, body) = route(&request);
                    let response = format!(
                        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    stream.write_all(response.as_bytes()).await.unwrap();
                    let _ = stream.shutdown().await;
                });
            }
        });
        format!("http://{addr}/")
    }

    fn route(request: &Request) -> (&'static str, String) {
        let body: Value = serde_json::from_str(&request.body).unwrap_or(Value::Null);
        match (request.method.as_str(), request.path.as_str()) {
            ("GET", "/") => ("200 OK", json!({"message": "ok"}).to_string()),
            ("POST", "/auth/signin") => {
                if body["email"] == "a@example.com" && body["password"] == "hunter2" {
                    (
                        "200 OK",
                        json!({"access_token": "tok-a", "email": "a@example.com", "id": "u1"})
                            .to_string(),
                    )
                } else {
                    ("401 Unauthorized", json!({"detail": "bad credentials"}).to_string())
                }
            }
            ("POST", "/auth/signup") => (
                "200 OK",
                json!({"access_token": "tok-new", "email": body["email"]}).to_string(),
            ),
            ("GET", "/auth/me") => match request.authorization.as_deref() {
                Some("Bearer tok-a") => (
                    "200 OK",
                    json!({"email": "a@example.com", "id": "u1"}).to_string(),
                ),
                _ => ("401 Unauthorized", json!({"detail": "invalid token"}).to_string()),
            },
            ("POST", "/auth/oauth") => {
                if body["provider"] == "google" {
                    (
                        "200 OK",
                        json!({"url": "https://accounts.example.com/authorize?p=google"})
                            .to_string(),
                    )
                } else {
                    ("400 Bad Request", json!({"detail": "unsupported"}).to_string())
                }
            }
            _ => ("404 Not Found", json!({"detail": "not found"}).to_string()),
        }
    }

    #[tokio::test]
    async fn health_and_sign_in() {
        let base = spawn_auth_server().await;
        let client = AuthClient::new(Some(base)).unwrap();
        assert_eq!(client.health().await.unwrap(), "ok");

        let resp = client.sign_in("a@example.com", "hunter2").await.unwrap();
        assert_eq!(resp.access_token, "tok-a");
        assert_eq!(resp.email, "a@example.com");

        let err = client.sign_in("a@example.com", "wrong").await.unwrap_err();
        assert!(err.is_authentication());
        assert!(err.to_string().contains("Signin failed"));
    }

    #[tokio::test]
    async fn profile_rejects_unknown_token() {
        let base = spawn_auth_server().await;
        let client = AuthClient::new(Some(base)).unwrap();
        assert_eq!(client.get_profile("tok-a").await.unwrap().email, "a@example.com");
        let err = client.get_profile("nope").await.unwrap_err();
        assert!(err.is_authentication());
        assert!(err.to_string().contains("Invalid token"));
    }

    #[tokio::test]
    async fn oauth_redirect_url() {
        let base = spawn_auth_server().await;
        let client = AuthClient::new(Some(base)).unwrap();
        assert_eq!(
            client.get_oauth_redirect_url("google").await.unwrap(),
            "https://accounts.example.com/authorize?p=google"
        );
        let err = client.get_oauth_redirect_url("myspace").await.unwrap_err();
        assert!(err.is_authentication());
    }

    #[tokio::test]
    async fn session_store_over_http() {
        let base = spawn_auth_server().await;
        let client = AuthClient::new(Some(base)).unwrap();

        let storage = MemoryStorage::with_token("stale");
        let mut store = SessionStore::load(storage.clone()).unwrap();
        assert_eq!(store.restore(&client).await.unwrap(), RestoreOutcome::Invalidated);
        assert_eq!(storage.snapshot(), None);

        store.sign_up(&client, "b@example.com", "pw").await.unwrap();
        assert_eq!(store.token(), Some("tok-new"));
        assert_eq!(storage.snapshot().as_deref(), Some("tok-new"));

        let mut store = SessionStore::load(MemoryStorage::new()).unwrap();
        let outcome = handle_callback(
            "http://localhost:3000/#access_token=tok-a&token_type=bearer",
            &client,
            &mut store,
        )
        .await
        .unwrap();
        assert_eq!(outcome, CallbackOutcome::SignedIn("a@example.com".to_string()));
        assert!(store.is_authenticated());
    }

    /// A chat backend that checks the handshake, echoes each input, and closes on "bye".
    async fn spawn_chat_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut ws = accept_async(stream).await.unwrap();
                    let Some(Ok(WsMessage::Text(first))) = ws.next().await else {
                        return;
                    };
                    let handshake: Value = serde_json::from_str(&first).unwrap();
                    if handshake["access_token"] != "tok-a" {
                        let _ = ws
                            .close(Some(CloseFrame {
                                code: CloseCode::Policy,
                                reason: "Invalid access token".into(),
                            }))
                            .await;
                        return;
                    }
                    let thread = handshake["thread_id"].as_str().unwrap_or("").to_string();
                    while let Some(Ok(msg)) = ws.next().await {
                        let WsMessage::Text(text) = msg else {
                            continue;
                        };
                        let frame: Value = serde_json::from_str(&text).unwrap();
                        let input = frame["input"].as_str().unwrap_or("").to_string();
                        let reply = match input.as_str() {
                            "bye" => {
                                let _ = ws
                                    .close(Some(CloseFrame {
                                        code: CloseCode::Normal,
                                        reason: "session over".into(),
                                    }))
                                    .await;
                                return;
                            }
                            "fail" => json!({"error": "model unavailable"}),
                            _ => json!({
                                "response": format!("[{thread}] {input}"),
                                "emotion": "calm",
                                "mode": "support",
                                "is_crisis": false,
                                "attack": "safe",
                            }),
                        };
                        if ws.send(WsMessage::Text(reply.to_string())).await.is_err() {
                            return;
                        }
                    }
                });
            }
        });
        format!("ws://{addr}/chat/ws/chat")
    }

    async fn reply_within(session: &mut ChatSession<WebSocketConnector>) -> Vec<confidant::Message> {
        tokio::time::timeout(Duration::from_secs(5), session.wait_for_reply())
            .await
            .expect("reply timed out")
    }

    #[tokio::test]
    async fn chat_round_trip() {
        let url = spawn_chat_server().await;
        let mut session = ChatSession::new(WebSocketConnector::new(Some(url)).unwrap());
        session.open("tok-a", "journal").await.unwrap();
        assert_eq!(session.state(), ConnectionState::Open);

        assert_eq!(session.submit("hello").await.unwrap(), SubmitOutcome::Sent);
        assert_eq!(
            session.submit("again").await.unwrap(),
            SubmitOutcome::Rejected(SubmitRejected::Pending)
        );
        let replies = reply_within(&mut session).await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].role, Role::Assistant);
        assert_eq!(replies[0].content, "[journal] hello");
        let meta = replies[0].meta.as_ref().unwrap();
        assert_eq!(meta.emotion.as_deref(), Some("calm"));
        assert_eq!(meta.flagged_attack(), None);

        session.submit("fail").await.unwrap();
        let replies = reply_within(&mut session).await;
        assert_eq!(replies[0].role, Role::System);
        assert_eq!(replies[0].content, "Error: model unavailable");
        assert_eq!(session.state(), ConnectionState::Open);
        assert!(session.can_submit());

        session.close().await;
        assert_eq!(session.state(), ConnectionState::Closed);
        assert_eq!(
            session.messages().last().unwrap().content,
            "Connection closed: closed by client"
        );
        assert_eq!(session.messages().len(), 5);
    }

    #[tokio::test]
    async fn server_close_is_logged_with_reason() {
        let url = spawn_chat_server().await;
        let mut session = ChatSession::new(WebSocketConnector::new(Some(url)).unwrap());
        session.open("tok-a", "default").await.unwrap();

        session.submit("bye").await.unwrap();
        let replies = reply_within(&mut session).await;
        assert_eq!(
            replies.last().unwrap().content,
            "Connection closed: session over"
        );
        assert_eq!(session.state(), ConnectionState::Closed);
        assert!(!session.is_pending());
        assert_eq!(
            session.submit("anyone?").await.unwrap(),
            SubmitOutcome::Rejected(SubmitRejected::NotOpen(ConnectionState::Closed))
        );
    }

    #[tokio::test]
    async fn bad_token_is_closed_by_server() {
        let url = spawn_chat_server().await;
        let mut session = ChatSession::new(WebSocketConnector::new(Some(url)).unwrap());
        session.open("stale", "default").await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(5), session.next_event())
            .await
            .unwrap();
        assert_eq!(
            event,
            Some(ChatEvent::Closed("Invalid access token".to_string()))
        );
        assert_eq!(session.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn idle_server_close_blocks_next_turn() {
        let url = spawn_chat_server().await;
        let mut session = ChatSession::new(WebSocketConnector::new(Some(url)).unwrap());
        session.open("stale", "default").await.unwrap();
        assert_eq!(session.state(), ConnectionState::Open);

        // Nobody is waiting on a reply; the close is only seen by polling.
        let mut events = Vec::new();
        for _ in 0..100 {
            events = session.poll_events();
            if !events.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(matches!(events.last(), Some(ChatEvent::Closed(_))));
        assert_eq!(session.state(), ConnectionState::Closed);

        assert_eq!(
            session.submit("hello").await.unwrap(),
            SubmitOutcome::Rejected(SubmitRejected::NotOpen(ConnectionState::Closed))
        );
        assert_eq!(session.messages().len(), 1);
        assert!(session.messages()[0].content.starts_with("Connection closed:"));
    }

    #[tokio::test]
    async fn reconnect_keeps_history() {
        let url = spawn_chat_server().await;
        let mut session = ChatSession::new(WebSocketConnector::new(Some(url)).unwrap());
        session.open("tok-a", "one").await.unwrap();
        session.submit("first").await.unwrap();
        reply_within(&mut session).await;

        session.open("tok-a", "two").await.unwrap();
        assert_eq!(session.thread_id(), Some("two"));
        session.submit("second").await.unwrap();
        let replies = reply_within(&mut session).await;
        assert_eq!(replies[0].content, "[two] second");

        let contents: Vec<_> = session.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "first",
                "[one] first",
                "Connection closed: closed by client",
                "second",
                "[two] second",
            ]
        );
    }

    #[tokio::test]
    async fn connect_failure_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = format!("ws://{addr}/chat/ws/chat");
        let mut session = ChatSession::new(WebSocketConnector::new(Some(url)).unwrap());
        let err = session.open("tok-a", "default").await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(session.state(), ConnectionState::Closed);
        assert!(
            session
                .messages()
                .last()
                .unwrap()
                .content
                .starts_with("Connection closed:")
        );
    }
}
