use std::{
    io,
    sync::{Arc, Mutex},
};

use engine::{
    GridStore, StoreError,
    grid::{CellLocation, CellValue, Column, GridRange},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use sheets::{Credentials, SPREADSHEETS_SCOPE, SheetsClient};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

const PRIVATE_KEY: &str = include_str!("../testdata/service_account.pem");
const PUBLIC_KEY: &str = include_str!("../testdata/service_account.pub.pem");

const PERMISSION_DENIED: &str = r#"{
    "error": {
        "code": 403,
        "message": "The caller does not have permission",
        "status": "PERMISSION_DENIED"
    }
}"#;

#[derive(Clone, Debug)]
struct Request {
    method: String,
    target: String,
    authorization: Option<String>,
    body: String,
}

impl Request {
    fn form_field(&self, name: &str) -> Option<&str> {
        self.body
            .split('&')
            .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
    }
}

type Responder = dyn Fn(&Request) -> (u16, String) + Send + Sync;

/// HTTP/1.1 server on a local port answering every request with `respond`.
struct Server {
    url: String,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl Server {
    async fn start(respond: impl Fn(&Request) -> (u16, String) + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let respond: Arc<Responder> = Arc::new(respond);

        let seen = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let Ok(request) = read_request(&mut stream).await else {
                    continue;
                };
                let (status, body) = respond(&request);
                seen.lock().unwrap().push(request);

                let reply = format!(
                    "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(reply.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self { url, requests }
    }

    fn base_url(&self) -> String {
        format!("{}/v4/", self.url)
    }

    fn token_uri(&self) -> String {
        format!("{}/token", self.url)
    }

    fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    fn requests_to(&self, path: &str) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|request| request.target.starts_with(path))
            .collect()
    }
}

async fn read_request(stream: &mut TcpStream) -> io::Result<Request> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_len = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_len]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split(' ');
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();

    let mut content_length = 0;
    let mut authorization = None;
    for (name, value) in lines.filter_map(|line| line.split_once(':')) {
        match name.trim().to_ascii_lowercase().as_str() {
            "content-length" => content_length = value.trim().parse().unwrap_or(0),
            "authorization" => authorization = Some(value.trim().to_string()),
            _ => {}
        }
    }

    while buf.len() < head_len + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let end = buf.len().min(head_len + content_length);
    let body = String::from_utf8_lossy(&buf[head_len..end]).into_owned();

    Ok(Request {
        method,
        target,
        authorization,
        body,
    })
}

fn client(base_url: &str, credentials: Credentials) -> SheetsClient {
    SheetsClient::builder()
        .spreadsheet_id("sheet-id")
        .credentials(credentials)
        .base_url(base_url)
        .build()
        .unwrap()
}

fn access_token() -> Credentials {
    Credentials::AccessToken("ya29.static".to_string())
}

fn data_band() -> GridRange {
    GridRange::span(
        "Transactions",
        CellLocation::new(Column::A, 3),
        CellLocation::whole_column(Column::try_from('F').unwrap()),
    )
}

fn row_seven() -> GridRange {
    let f = Column::try_from('F').unwrap();
    GridRange::span(
        "Transactions",
        CellLocation::new(Column::A, 7),
        CellLocation::new(f, 7),
    )
}

fn authorized_user(token_uri: &str) -> Credentials {
    let json = serde_json::json!({
        "type": "authorized_user",
        "client_id": "123.apps.googleusercontent.com",
        "client_secret": "shh",
        "refresh_token": "1//refresh",
        "token_uri": token_uri,
    });
    Credentials::from_json(&json.to_string()).unwrap()
}

fn token_reply(access_token: &str, expires_in: u64) -> (u16, String) {
    let body = serde_json::json!({
        "access_token": access_token,
        "expires_in": expires_in,
        "token_type": "Bearer",
    });
    (200, body.to_string())
}

/// Answers the token endpoint with `token` and every values call with an
/// empty range.
async fn server_issuing(token: &'static str, expires_in: u64) -> Server {
    Server::start(move |request| {
        if request.target.starts_with("/token") {
            token_reply(token, expires_in)
        } else {
            (200, r#"{"range": "Transactions!A3:F"}"#.to_string())
        }
    })
    .await
}

#[tokio::test]
async fn append_sends_user_entered_rows() {
    let server = Server::start(|_| (200, "{}".to_string())).await;
    let client = client(&server.base_url(), access_token());

    client
        .append(&data_band(), &["101".into(), CellValue::Number(9.5), CellValue::Blank])
        .await
        .unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(
        request.target,
        "/v4/spreadsheets/sheet-id/values/Transactions!A3:F:append\
         ?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS"
    );
    assert_eq!(request.authorization.as_deref(), Some("Bearer ya29.static"));

    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "range": "Transactions!A3:F",
            "majorDimension": "ROWS",
            "values": [["101", 9.5, ""]],
        })
    );
}

#[tokio::test]
async fn overwrite_and_clear_target_the_row() {
    let server = Server::start(|_| (200, "{}".to_string())).await;
    let client = client(&server.base_url(), access_token());

    client.overwrite(&row_seven(), &["x".into()]).await.unwrap();
    client.clear(&row_seven()).await.unwrap();

    let requests = server.requests();
    assert_eq!(requests[0].method, "PUT");
    assert_eq!(
        requests[0].target,
        "/v4/spreadsheets/sheet-id/values/Transactions!A7:F7?valueInputOption=USER_ENTERED"
    );
    assert_eq!(requests[1].method, "POST");
    assert_eq!(
        requests[1].target,
        "/v4/spreadsheets/sheet-id/values/Transactions!A7:F7:clear"
    );
    assert_eq!(requests[1].body, "{}");
}

#[tokio::test]
async fn fetch_decodes_unformatted_rows() {
    let server = Server::start(|_| {
        let body = r#"{
            "range": "Transactions!B3:B",
            "majorDimension": "ROWS",
            "values": [["101", 9.5], [], ["x"]]
        }"#;
        (200, body.to_string())
    })
    .await;
    let client = client(&server.base_url(), access_token());
    let scan = GridRange::span(
        "Transactions",
        CellLocation::new(Column::try_from('B').unwrap(), 3),
        CellLocation::whole_column(Column::try_from('B').unwrap()),
    );

    let values = client.fetch_values(&scan).await.unwrap();
    assert_eq!(
        values,
        vec![
            vec![CellValue::from("101"), CellValue::Number(9.5)],
            vec![],
            vec![CellValue::from("x")],
        ]
    );
    assert_eq!(
        server.requests()[0].target,
        "/v4/spreadsheets/sheet-id/values/Transactions!B3:B\
         ?valueRenderOption=UNFORMATTED_VALUE&majorDimension=ROWS"
    );
}

#[tokio::test]
async fn success_means_exactly_200() {
    let server = Server::start(|_| (204, String::new())).await;
    let client = client(&server.base_url(), access_token());

    let err = client.append(&data_band(), &["x".into()]).await.unwrap_err();
    let StoreError::RemoteWriteFailed(message) = &err else {
        panic!("expected a write failure, got {err:?}");
    };
    assert!(message.contains("204"), "{message}");
}

#[tokio::test]
async fn google_error_message_is_surfaced() {
    let server = Server::start(|_| (403, PERMISSION_DENIED.to_string())).await;
    let client = client(&server.base_url(), access_token());

    let err = client.fetch_values(&data_band()).await.unwrap_err();
    let StoreError::RemoteReadFailed(message) = &err else {
        panic!("expected a read failure, got {err:?}");
    };
    assert!(message.contains("403"), "{message}");
    assert!(message.contains("The caller does not have permission"), "{message}");

    let err = client.clear(&row_seven()).await.unwrap_err();
    assert!(matches!(err, StoreError::RemoteWriteFailed(m) if m.contains("permission")));
}

#[tokio::test]
async fn transport_failure_is_a_store_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/v4/", listener.local_addr().unwrap());
    drop(listener);
    let client = client(&base_url, access_token());

    let err = client.fetch_values(&data_band()).await.unwrap_err();
    assert!(matches!(err, StoreError::RemoteReadFailed(m) if m.starts_with("network error")));

    let err = client.append(&data_band(), &["x".into()]).await.unwrap_err();
    assert!(matches!(err, StoreError::RemoteWriteFailed(m) if m.starts_with("network error")));
}

#[tokio::test]
async fn refreshed_token_is_cached() {
    let server = server_issuing("ya29.fresh", 3600).await;
    let client = client(&server.base_url(), authorized_user(&server.token_uri()));

    client.fetch_values(&data_band()).await.unwrap();
    client.fetch_values(&data_band()).await.unwrap();

    let token_requests = server.requests_to("/token");
    assert_eq!(token_requests.len(), 1);
    assert_eq!(token_requests[0].method, "POST");
    assert_eq!(token_requests[0].form_field("grant_type"), Some("refresh_token"));
    assert_eq!(token_requests[0].form_field("client_secret"), Some("shh"));

    let values_requests = server.requests_to("/v4/");
    assert_eq!(values_requests.len(), 2);
    for request in values_requests {
        assert_eq!(request.authorization.as_deref(), Some("Bearer ya29.fresh"));
    }
}

#[tokio::test]
async fn token_close_to_expiry_is_refreshed() {
    // Shorter than the refresh margin, so it is stale as soon as it arrives.
    let server = server_issuing("ya29.short", 30).await;
    let client = client(&server.base_url(), authorized_user(&server.token_uri()));

    client.fetch_values(&data_band()).await.unwrap();
    client.fetch_values(&data_band()).await.unwrap();

    assert_eq!(server.requests_to("/token").len(), 2);
}

#[tokio::test]
async fn rejected_refresh_fails_the_call() {
    let server = Server::start(|request| {
        if request.target.starts_with("/token") {
            (400, r#"{"error": "invalid_grant"}"#.to_string())
        } else {
            (200, "{}".to_string())
        }
    })
    .await;
    let client = client(&server.base_url(), authorized_user(&server.token_uri()));

    let err = client.append(&data_band(), &["x".into()]).await.unwrap_err();
    let StoreError::RemoteWriteFailed(message) = &err else {
        panic!("expected a write failure, got {err:?}");
    };
    assert!(message.starts_with("token refresh failed"), "{message}");
    assert!(message.contains("invalid_grant"), "{message}");
    assert!(server.requests_to("/v4/").is_empty());
}

#[tokio::test]
async fn service_account_trades_a_signed_assertion() {
    let server = server_issuing("ya29.service", 3600).await;
    let key = serde_json::json!({
        "type": "service_account",
        "private_key_id": "key-1",
        "private_key": PRIVATE_KEY,
        "client_email": "bot@telemoney.iam.gserviceaccount.com",
        "token_uri": server.token_uri(),
    });
    let credentials = Credentials::from_json(&key.to_string()).unwrap();
    let client = client(&server.base_url(), credentials);

    client.fetch_values(&data_band()).await.unwrap();

    let token_requests = server.requests_to("/token");
    assert_eq!(token_requests.len(), 1);
    assert_eq!(
        token_requests[0].form_field("grant_type"),
        Some("urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer")
    );

    let assertion = token_requests[0].form_field("assertion").unwrap();
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[server.token_uri()]);
    validation.set_issuer(&["bot@telemoney.iam.gserviceaccount.com"]);
    let public_key = DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap();
    let claims = jsonwebtoken::decode::<serde_json::Value>(assertion, &public_key, &validation)
        .unwrap()
        .claims;
    assert_eq!(claims["scope"], SPREADSHEETS_SCOPE);

    let values_requests = server.requests_to("/v4/");
    assert_eq!(
        values_requests[0].authorization.as_deref(),
        Some("Bearer ya29.service")
    );
}
