use crate::error::ApiError;
use crate::extract::{extract_header_value, extract_value};
use crate::request::RequestBuilder;
use crate::responses::{parse_library_items, parse_projects, parse_search_results};
use crate::transport::{TlsTransport, Transport};
use std::sync::Arc;

pub mod error;
pub mod extract;
pub mod push;
mod request;
pub mod responses;
pub mod transport;

// --- Public API ---
pub use push::{DatasetPush, PushError, PushState};
pub use request::parse_url;
pub use responses::{LibraryItem, Project, SearchResult};

/// HTTPS is the only scheme the remote speaks.
const HTTPS_PORT: u16 = 443;

/// The authenticated context for calling the remote API.
///
/// Created unauthenticated; `login` fills the token and cookies and flips
/// `authenticated`, logout (or a failed login) clears them again. Owned by
/// the orchestrator and passed by reference into every protocol call.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub base_url: String,
    pub auth_token: String,
    /// All session cookies, already serialized as a single `Cookie:` header
    /// value (`name=value; name=value`).
    pub cookies: String,
    pub project_id: String,
    pub username: String,
    pub authenticated: bool,
}

impl Session {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Drops all credentials and returns to the unauthenticated state.
    pub fn clear(&mut self) {
        self.auth_token.clear();
        self.cookies.clear();
        self.authenticated = false;
    }
}

/// Session-protocol client for the BI server's REST API.
///
/// Every operation is one blocking round-trip: build the raw request from
/// `base_url` + endpoint path, attach the standard headers, send it through
/// the transport, and pick the response apart with the scanning extractor.
/// Authenticated operations fail with [`ApiError::NotAuthenticated`] before
/// touching the network when the session is not logged in.
pub struct MstrClient {
    transport: Arc<dyn Transport>,
}

impl MstrClient {
    /// Creates a client over the production TLS transport.
    pub fn new() -> Result<Self, ApiError> {
        Ok(Self {
            transport: Arc::new(TlsTransport::new()?),
        })
    }

    /// Creates a client over a caller-supplied transport (used by tests).
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    // --- Session lifecycle ---

    /// Authenticates against `/api/auth/login`.
    ///
    /// The token comes from the `X-MSTR-AuthToken` response header, never
    /// the body; cookies are accumulated from every `Set-Cookie` header with
    /// their attributes stripped. A reply without the token header is a
    /// failed login regardless of HTTP status.
    pub async fn login(
        &self,
        session: &mut Session,
        username: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        let (host, base_path) = parse_url(&session.base_url);
        let body = serde_json::json!({ "username": username, "password": password });

        let request = RequestBuilder::new("POST", &host, &format!("{base_path}/api/auth/login"))
            .json_body(body.to_string())
            .build();

        let response = self.transport.send(&host, HTTPS_PORT, &request).await?;

        let auth_token = extract_header_value(&response.headers, "X-MSTR-AuthToken");
        if auth_token.is_empty() {
            session.clear();
            return Err(ApiError::MissingField("X-MSTR-AuthToken"));
        }

        session.auth_token = auth_token;
        session.cookies = collect_cookies(&response.headers);
        session.username = username.to_string();
        session.authenticated = true;
        tracing::info!(username, "login succeeded");
        Ok(())
    }

    /// Terminates the server-side session. Best-effort: the caller clears
    /// its local state whether or not this round-trip succeeds.
    pub async fn logout(&self, session: &Session) -> Result<(), ApiError> {
        let (host, base_path) = parse_url(&session.base_url);

        let request = RequestBuilder::new("POST", &host, &format!("{base_path}/api/auth/logout"))
            .auth(session)
            .empty_body()
            .build();

        self.transport.send(&host, HTTPS_PORT, &request).await?;
        tracing::info!("logout sent");
        Ok(())
    }

    // --- Catalog queries ---

    /// GET `/api/projects` — projects visible to the session user.
    pub async fn get_projects(&self, session: &Session) -> Result<Vec<Project>, ApiError> {
        let body = self
            .authed_get(session, "/api/projects".to_string())
            .await?;
        Ok(parse_projects(&body))
    }

    /// GET `/api/searches/results` — object search by name and/or type.
    pub async fn search(
        &self,
        session: &Session,
        name: Option<&str>,
        object_type: Option<u32>,
        limit: u32,
    ) -> Result<Vec<SearchResult>, ApiError> {
        let mut path = String::from("/api/searches/results?");
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            path.push_str(&format!("name={name}&"));
        }
        if let Some(object_type) = object_type.filter(|t| *t > 0) {
            path.push_str(&format!("type={object_type}&"));
        }
        path.push_str(&format!("limit={limit}"));

        let body = self.authed_get(session, path).await?;
        Ok(parse_search_results(&body))
    }

    /// GET `/api/library` — the user's library listing.
    pub async fn get_library(
        &self,
        session: &Session,
        limit: u32,
    ) -> Result<Vec<LibraryItem>, ApiError> {
        let body = self
            .authed_get(session, format!("/api/library?outputFlag=DEFAULT&limit={limit}"))
            .await?;
        Ok(parse_library_items(&body))
    }

    /// GET `/api/model/reports/{id}` — the report's definition tree.
    pub async fn get_report_definition(
        &self,
        session: &Session,
        report_id: &str,
    ) -> Result<String, ApiError> {
        self.authed_get(
            session,
            format!("/api/model/reports/{report_id}?showExpressionAs=tree"),
        )
        .await
    }

    /// POST `/api/reports/{id}/instances` — executes the report and returns
    /// the first page of data (fixed page size 100).
    pub async fn get_report(&self, session: &Session, report_id: &str) -> Result<String, ApiError> {
        self.authed_empty_post(
            session,
            format!("/api/reports/{report_id}/instances?limit=100"),
        )
        .await
    }

    /// POST `/api/cubes/{id}/instances` — creates a cube instance for
    /// subsequent paged reads.
    pub async fn create_cube(&self, session: &Session, cube_id: &str) -> Result<String, ApiError> {
        self.authed_empty_post(session, format!("/api/cubes/{cube_id}/instances"))
            .await
    }

    /// GET `/api/cubes/{id}/instances/{instance}` — one page of cube data.
    pub async fn get_cube(
        &self,
        session: &Session,
        cube_id: &str,
        instance_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<String, ApiError> {
        self.authed_get(
            session,
            format!("/api/cubes/{cube_id}/instances/{instance_id}?offset={offset}&limit={limit}"),
        )
        .await
    }

    // --- Dataset push workflow ---

    /// POST `/api/datasets` — creates a dataset from a JSON definition and
    /// returns its id, extracted from the response body.
    pub async fn create_dataset(
        &self,
        session: &Session,
        json_definition: &str,
    ) -> Result<String, ApiError> {
        let body = self
            .authed_json_post("POST", session, "/api/datasets".to_string(), json_definition)
            .await?;

        let dataset_id = extract_value(&body, "id");
        if dataset_id.is_empty() {
            return Err(ApiError::MissingField("id"));
        }
        Ok(dataset_id)
    }

    /// POST `/api/datasets/{id}/uploadSessions` — opens a staging handle for
    /// the multi-step publish and returns its id.
    pub async fn create_upload_session(
        &self,
        session: &Session,
        dataset_id: &str,
    ) -> Result<String, ApiError> {
        let body = self
            .authed_empty_post(session, format!("/api/datasets/{dataset_id}/uploadSessions"))
            .await?;

        let upload_id = extract_value(&body, "uploadSessionId");
        if upload_id.is_empty() {
            return Err(ApiError::MissingField("uploadSessionId"));
        }
        Ok(upload_id)
    }

    /// PUT `/api/datasets/{id}/uploadSessions/{uploadId}` — stages one table
    /// of row data into the open upload session.
    pub async fn upload_data(
        &self,
        session: &Session,
        dataset_id: &str,
        upload_id: &str,
        table_name: &str,
        json_rows: &str,
    ) -> Result<(), ApiError> {
        self.authed_json_post(
            "PUT",
            session,
            format!("/api/datasets/{dataset_id}/uploadSessions/{upload_id}?tableName={table_name}"),
            json_rows,
        )
        .await?;
        Ok(())
    }

    /// POST `.../publish` — commits the staged upload session.
    pub async fn publish_dataset(
        &self,
        session: &Session,
        dataset_id: &str,
        upload_id: &str,
    ) -> Result<(), ApiError> {
        self.authed_empty_post(
            session,
            format!("/api/datasets/{dataset_id}/uploadSessions/{upload_id}/publish"),
        )
        .await?;
        Ok(())
    }

    /// POST `/api/cubes/{id}/instances` with row data — single-call refresh
    /// of an existing cube, independent of the dataset-push chain.
    pub async fn update_cube(
        &self,
        session: &Session,
        cube_id: &str,
        json_rows: &str,
    ) -> Result<(), ApiError> {
        self.authed_json_post(
            "POST",
            session,
            format!("/api/cubes/{cube_id}/instances"),
            json_rows,
        )
        .await?;
        Ok(())
    }

    // --- Request plumbing ---

    fn require_auth(session: &Session) -> Result<(), ApiError> {
        if session.authenticated {
            Ok(())
        } else {
            Err(ApiError::NotAuthenticated)
        }
    }

    async fn authed_get(&self, session: &Session, endpoint: String) -> Result<String, ApiError> {
        Self::require_auth(session)?;
        let (host, base_path) = parse_url(&session.base_url);

        let request = RequestBuilder::new("GET", &host, &format!("{base_path}{endpoint}"))
            .auth(session)
            .build();

        let response = self.transport.send(&host, HTTPS_PORT, &request).await?;
        Ok(response.body)
    }

    async fn authed_empty_post(
        &self,
        session: &Session,
        endpoint: String,
    ) -> Result<String, ApiError> {
        Self::require_auth(session)?;
        let (host, base_path) = parse_url(&session.base_url);

        let request = RequestBuilder::new("POST", &host, &format!("{base_path}{endpoint}"))
            .auth(session)
            .empty_body()
            .build();

        let response = self.transport.send(&host, HTTPS_PORT, &request).await?;
        Ok(response.body)
    }

    async fn authed_json_post(
        &self,
        method: &'static str,
        session: &Session,
        endpoint: String,
        body: &str,
    ) -> Result<String, ApiError> {
        Self::require_auth(session)?;
        let (host, base_path) = parse_url(&session.base_url);

        let request = RequestBuilder::new(method, &host, &format!("{base_path}{endpoint}"))
            .auth(session)
            .json_body(body.to_string())
            .build();

        let response = self.transport.send(&host, HTTPS_PORT, &request).await?;
        Ok(response.body)
    }
}

/// Accumulates session cookies from every `Set-Cookie` response header:
/// each value is truncated at its first `;` (dropping `Path`, `HttpOnly`
/// and friends) and the survivors are joined with `"; "` in
/// header-encounter order, ready to be sent back as one `Cookie:` value.
fn collect_cookies(headers: &[String]) -> String {
    let mut cookies = String::new();

    for header in headers {
        if !header.to_ascii_lowercase().contains("set-cookie:") {
            continue;
        }
        let Some(pos) = header.find(':') else { continue };

        let mut value = header[pos + 1..].trim_start();
        if let Some(semicolon) = value.find(';') {
            value = &value[..semicolon];
        }
        let value = value.trim_end();

        if !value.is_empty() {
            if !cookies.is_empty() {
                cookies.push_str("; ");
            }
            cookies.push_str(value);
        }
    }

    cookies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RawResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted transport: hands out canned responses in order and records
    /// every request it was asked to send.
    struct MockTransport {
        responses: Mutex<Vec<RawResponse>>,
        requests: Mutex<Vec<String>>,
    }

    impl MockTransport {
        fn new(mut responses: Vec<RawResponse>) -> Arc<Self> {
            responses.reverse();
            Arc::new(Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(
            &self,
            _host: &str,
            _port: u16,
            request: &[u8],
        ) -> Result<RawResponse, ApiError> {
            self.requests
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(request).into_owned());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ApiError::Request("no scripted response".to_string()))
        }
    }

    fn ok(headers: Vec<&str>, body: &str) -> RawResponse {
        RawResponse {
            status: 200,
            headers: headers.into_iter().map(String::from).collect(),
            body: body.to_string(),
        }
    }

    fn logged_in_session() -> Session {
        Session {
            base_url: "https://bi.example.com/Lib".to_string(),
            auth_token: "tok".to_string(),
            cookies: "JSESSIONID=abc".to_string(),
            project_id: "PROJ".to_string(),
            username: "admin".to_string(),
            authenticated: true,
        }
    }

    #[tokio::test]
    async fn login_collects_token_and_cookies() {
        let transport = MockTransport::new(vec![ok(
            vec![
                "X-MSTR-AuthToken: tok-1",
                "Set-Cookie: JSESSIONID=abc; Path=/",
                "Set-Cookie: iSession=xyz; HttpOnly",
            ],
            "{}",
        )]);
        let client = MstrClient::with_transport(transport.clone());
        let mut session = Session::new("https://bi.example.com/Lib");

        client.login(&mut session, "admin", "pw").await.unwrap();

        assert!(session.authenticated);
        assert_eq!(session.auth_token, "tok-1");
        assert_eq!(session.cookies, "JSESSIONID=abc; iSession=xyz");
        assert_eq!(session.username, "admin");

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("POST /Lib/api/auth/login HTTP/1.1\r\n"));
        assert!(sent[0].contains("Host: bi.example.com\r\n"));
        assert!(sent[0].contains("Content-Type: application/json\r\n"));
        assert!(sent[0].contains("Connection: close\r\n"));
        assert!(sent[0].contains("\"username\":\"admin\""));
    }

    #[tokio::test]
    async fn login_without_token_header_fails_despite_200() {
        let transport = MockTransport::new(vec![ok(vec!["Content-Type: application/json"], "{}")]);
        let client = MstrClient::with_transport(transport);
        let mut session = Session::new("https://bi.example.com/Lib");

        let err = client.login(&mut session, "admin", "pw").await.unwrap_err();
        assert!(matches!(err, ApiError::MissingField("X-MSTR-AuthToken")));
        assert!(!session.authenticated);
        assert!(session.auth_token.is_empty());
    }

    #[tokio::test]
    async fn authenticated_calls_refuse_without_login() {
        let transport = MockTransport::new(vec![]);
        let client = MstrClient::with_transport(transport.clone());
        let session = Session::new("https://bi.example.com/Lib");

        let err = client.get_projects(&session).await.unwrap_err();
        assert!(matches!(err, ApiError::NotAuthenticated));
        // The caller error never reaches the network.
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn authed_get_carries_the_standard_headers() {
        let transport = MockTransport::new(vec![ok(vec![], "[{\"id\":\"P1\",\"name\":\"Fin\"}]")]);
        let client = MstrClient::with_transport(transport.clone());

        let projects = client.get_projects(&logged_in_session()).await.unwrap();
        assert_eq!(projects.len(), 1);

        let sent = transport.sent();
        assert!(sent[0].starts_with("GET /Lib/api/projects HTTP/1.1\r\n"));
        assert!(sent[0].contains("X-MSTR-AuthToken: tok\r\n"));
        assert!(sent[0].contains("X-MSTR-ProjectID: PROJ\r\n"));
        assert!(sent[0].contains("Cookie: JSESSIONID=abc\r\n"));
        assert!(sent[0].contains("Connection: close\r\n"));
    }

    #[tokio::test]
    async fn search_builds_the_query_in_order() {
        let transport = MockTransport::new(vec![ok(vec![], "{\"result\":[]}")]);
        let client = MstrClient::with_transport(transport.clone());

        client
            .search(&logged_in_session(), Some("Revenue"), Some(3), 50)
            .await
            .unwrap();

        let sent = transport.sent();
        assert!(
            sent[0].starts_with("GET /Lib/api/searches/results?name=Revenue&type=3&limit=50 ")
        );
    }

    #[tokio::test]
    async fn report_execution_is_an_empty_post_with_fixed_page_size() {
        let transport = MockTransport::new(vec![ok(vec![], "{\"data\":[]}")]);
        let client = MstrClient::with_transport(transport.clone());

        client
            .get_report(&logged_in_session(), "R1")
            .await
            .unwrap();

        let sent = transport.sent();
        assert!(sent[0].starts_with("POST /Lib/api/reports/R1/instances?limit=100 "));
        assert!(sent[0].contains("Content-Length: 0\r\n"));
    }

    #[tokio::test]
    async fn create_dataset_extracts_the_id() {
        let transport = MockTransport::new(vec![ok(vec![], "{\"id\":\"DS9\",\"name\":\"x\"}")]);
        let client = MstrClient::with_transport(transport);

        let dataset_id = client
            .create_dataset(&logged_in_session(), "{\"name\":\"x\"}")
            .await
            .unwrap();
        assert_eq!(dataset_id, "DS9");
    }

    #[tokio::test]
    async fn upload_session_without_id_is_a_protocol_error() {
        let transport = MockTransport::new(vec![ok(vec![], "{\"status\":\"error\"}")]);
        let client = MstrClient::with_transport(transport);

        let err = client
            .create_upload_session(&logged_in_session(), "DS9")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MissingField("uploadSessionId")));
    }

    #[test]
    fn cookie_values_are_truncated_at_attributes() {
        let headers = vec![
            "Set-Cookie: JSESSIONID=abc; Path=/".to_string(),
            "Content-Type: application/json".to_string(),
            "Set-Cookie: iSession=xyz; HttpOnly".to_string(),
        ];
        assert_eq!(collect_cookies(&headers), "JSESSIONID=abc; iSession=xyz");
    }

    #[test]
    fn no_cookies_means_empty_header_value() {
        assert_eq!(collect_cookies(&["Content-Length: 2".to_string()]), "");
    }
}
