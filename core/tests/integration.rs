//! Full session lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `RequestClient` with
//! the real `UreqTransport` over HTTP: login, authenticated reads, both
//! payload styles, an upload, each failure class, and session expiry after
//! the server forgets the token.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use study_client::endpoints;
use study_client::{
    ClientConfig, HttpMethod, HttpRequest, JsonFileStorage, MemorySessionStore, PayloadEncoding, RequestClient,
    RequestDescriptor, RequestError, Session, SessionStore, StorageKeys, StorageSessionStore, Transport,
    TransportErrorKind, UploadCategory, UploadFile, UreqTransport,
};

fn start_mock_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}/api")
}

/// Serve exactly one canned raw HTTP response on a random port.
fn start_raw_server(status_line: &'static str, body: &'static [u8]) -> String {
    use std::io::{BufRead, BufReader, Write};

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                break;
            }
        }
        let mut stream = reader.into_inner();
        let head = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: text/html; charset=GBK\r\nContent-Length: {}\r\nConnection: close\r\n",
            body.len()
        );
        stream.write_all(head.as_bytes()).unwrap();
        stream.write_all(b"X-Server-Note: \xe7\xbd\x91\r\n\r\n").unwrap();
        stream.write_all(body).unwrap();
        stream.flush().unwrap();
    });
    format!("http://{addr}/api")
}

fn new_client(base_url: &str, session: Arc<dyn SessionStore>) -> RequestClient {
    RequestClient::new(ClientConfig::new(base_url), Arc::new(UreqTransport::new()), session)
}

#[tokio::test(flavor = "multi_thread")]
async fn session_lifecycle() {
    let base_url = start_mock_server();
    let dir = tempfile::tempdir().unwrap();
    let storage = JsonFileStorage::open(dir.path().join("storage.json")).unwrap();
    let session: Arc<dyn SessionStore> = Arc::new(StorageSessionStore::new(storage, StorageKeys::ADMIN));
    let client = new_client(&base_url, session.clone());

    // Step 1: authenticated call before login never leaves the process.
    let err = client.send(&endpoints::user::info()).await.unwrap_err();
    assert!(matches!(err, RequestError::Unauthenticated));

    // Step 2: wrong password is a business failure.
    let err = client
        .sign_in(&endpoints::admin::login("admin", "wrong").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, RequestError::Business { code: Some(500), .. }));
    assert!(session.get().is_none());

    // Step 3: login.
    let signed_in = client
        .sign_in(&endpoints::admin::login(mock_server::ADMIN_USERNAME, mock_server::ADMIN_PASSWORD).unwrap())
        .await
        .unwrap();
    assert_eq!(session.token().as_deref(), Some(signed_in.token.as_str()));

    // Step 4: profile.
    let user = client.send(&endpoints::user::info()).await.unwrap();
    assert_eq!(user["username"], "admin");

    // Step 5: paged list through the query string.
    let page = client
        .send(&endpoints::question::list(serde_json::json!({"subject": "math", "pageNum": 1, "pageSize": 1})).unwrap())
        .await
        .unwrap();
    assert_eq!(page["total"], 2);
    assert_eq!(page["records"].as_array().unwrap().len(), 1);

    // Step 6: answer submission in both payload styles.
    let answer = endpoints::question::Answer {
        answer: "A",
        time_spent: Some(42),
    };
    for encoding in [PayloadEncoding::Query, PayloadEncoding::Json] {
        let result = client
            .send(&endpoints::question::submit_answer(1, &answer, encoding).unwrap())
            .await
            .unwrap();
        assert_eq!(result["correct"], true, "{encoding:?}");
        assert_eq!(result["timeSpent"], 42, "{encoding:?}");
    }

    // Step 7: plan recommendation, query style.
    let plan = client
        .send(
            &endpoints::plan::recommend(
                &endpoints::plan::Recommend {
                    target_university: "Peking University",
                    target_major: "Mathematics",
                    exam_date: "2026-12-20",
                },
                PayloadEncoding::Query,
            )
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(plan["targetUniversity"], "Peking University");

    // Step 8: upload.
    let uploaded = client
        .upload(
            UploadCategory::Cover,
            UploadFile::new("cover.png", "image/png", vec![0x89, b'P', b'N', b'G']),
        )
        .await
        .unwrap();
    assert_eq!(uploaded["fileName"], "cover.png");
    assert_eq!(uploaded["contentType"], "image/png");
    assert_eq!(uploaded["size"], 4);

    // Step 9: non-envelope body and unknown route.
    let err = client.send(&RequestDescriptor::get("/broken")).await.unwrap_err();
    assert!(matches!(err, RequestError::MalformedResponse(_)));
    let err = client.send(&RequestDescriptor::get("/nope")).await.unwrap_err();
    assert!(matches!(err, RequestError::Http { status: 404, .. }));

    // Step 10: the server forgets the token; the next call expires the session.
    let other = new_client(&base_url, Arc::new(MemorySessionStore::with_session(signed_in.clone())));
    other.sign_out(&endpoints::admin::logout()).await.unwrap();

    let err = client.send(&endpoints::user::info()).await.unwrap_err();
    assert!(matches!(err, RequestError::SessionExpired));
    assert!(session.get().is_none());

    // Step 11: the cleared session was persisted.
    let reopened = StorageSessionStore::new(
        JsonFileStorage::open(dir.path().join("storage.json")).unwrap(),
        StorageKeys::ADMIN,
    );
    assert!(reopened.get().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn wechat_login_then_profile() {
    let base_url = start_mock_server();
    let client = new_client(&base_url, Arc::new(MemorySessionStore::new()));

    let session: Session = client
        .sign_in(
            &endpoints::user::wechat_login(&endpoints::user::WechatLogin {
                code: "wx-code".to_string(),
                nick_name: Some("Lin".to_string()),
                avatar_url: None,
                gender: None,
            })
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(session.user["nickName"], "Lin");

    let profile: Value = client.send(&endpoints::user::info()).await.unwrap();
    assert_eq!(profile["role"], "USER");
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_backend_is_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let client = RequestClient::new(
        ClientConfig::new(&format!("http://127.0.0.1:{port}/api")).with_timeout(Duration::from_secs(2)),
        Arc::new(UreqTransport::new()),
        Arc::new(MemorySessionStore::new()),
    );

    let err = client
        .send(&endpoints::admin::login("admin", "admin123").unwrap())
        .await
        .unwrap_err();
    match err {
        RequestError::Transport(inner) => {
            assert_ne!(inner.kind, TransportErrorKind::Timeout, "{inner}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn non_utf8_401_still_expires_session() {
    let base_url = start_raw_server("401 Unauthorized", b"\xff\xfe\xfd");
    let session = Arc::new(MemorySessionStore::with_session(Session::new("abc", Value::Null)));
    let client = new_client(&base_url, session.clone());

    let err = client.send(&endpoints::user::info()).await.unwrap_err();
    assert!(matches!(err, RequestError::SessionExpired), "{err:?}");
    assert!(session.get().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn non_utf8_gateway_page_is_http_error() {
    // "网关错误" in GBK.
    let base_url = start_raw_server("502 Bad Gateway", b"<html>\xcd\xf8\xb9\xd8\xb4\xed\xce\xf3</html>");
    let client = new_client(&base_url, Arc::new(MemorySessionStore::with_session(Session::new("abc", Value::Null))));

    let err = client.send(&endpoints::user::info()).await.unwrap_err();
    match err {
        RequestError::Http { status, body } => {
            assert_eq!(status, 502);
            assert!(body.starts_with("<html>"), "{body}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn non_ascii_header_value_is_kept() {
    let base_url = start_raw_server("200 OK", br#"{"code":200,"data":null}"#);
    let response = UreqTransport::new()
        .send(HttpRequest {
            method: HttpMethod::Get,
            url: format!("{base_url}/ping"),
            headers: Vec::new(),
            body: None,
            timeout: Duration::from_secs(5),
        })
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.header("x-server-note"), Some("网"));
    assert_eq!(response.body, r#"{"code":200,"data":null}"#);
}
