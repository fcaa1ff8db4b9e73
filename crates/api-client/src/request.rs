use crate::Session;

/// Splits a configured base URL into `(host, base_path)`.
///
/// A leading `scheme://` is stripped and the remainder is split at the first
/// `/`; everything from that slash on becomes the base path every endpoint
/// is appended to (e.g. `https://bi.example.com/MicroStrategyLibrary` →
/// `("bi.example.com", "/MicroStrategyLibrary")`). A URL without a path
/// yields an empty base path.
pub fn parse_url(base_url: &str) -> (String, String) {
    let mut host = base_url;
    if let Some(pos) = host.find("://") {
        host = &host[pos + 3..];
    }

    match host.find('/') {
        Some(pos) => (host[..pos].to_string(), host[pos..].to_string()),
        None => (host.to_string(), String::new()),
    }
}

/// Composes one raw HTTP/1.1 request.
///
/// The wire shape is fixed by the remote contract: request line, `Host`,
/// `Accept: application/json`, any operation headers, `Content-Length` when
/// a body is present or the request is a bodiless POST/PUT, and always
/// `Connection: close` so the transport can read the reply to EOF.
pub(crate) struct RequestBuilder {
    method: &'static str,
    host: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Option<String>,
    force_content_length: bool,
}

impl RequestBuilder {
    pub(crate) fn new(method: &'static str, host: &str, path: &str) -> Self {
        Self {
            method,
            host: host.to_string(),
            path: path.to_string(),
            headers: Vec::new(),
            body: None,
            force_content_length: false,
        }
    }

    /// Attaches the session's auth headers: the token, the project scope if
    /// one is selected, and the accumulated cookies as a single header.
    pub(crate) fn auth(mut self, session: &Session) -> Self {
        self.headers
            .push(("X-MSTR-AuthToken".to_string(), session.auth_token.clone()));
        if !session.project_id.is_empty() {
            self.headers
                .push(("X-MSTR-ProjectID".to_string(), session.project_id.clone()));
        }
        if !session.cookies.is_empty() {
            self.headers
                .push(("Cookie".to_string(), session.cookies.clone()));
        }
        self
    }

    pub(crate) fn json_body(mut self, body: String) -> Self {
        self.headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        self.body = Some(body);
        self
    }

    /// Marks a bodiless POST/PUT, which the server still expects to carry
    /// `Content-Length: 0`.
    pub(crate) fn empty_body(mut self) -> Self {
        self.force_content_length = true;
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let mut request = format!("{} {} HTTP/1.1\r\n", self.method, self.path);
        request.push_str(&format!("Host: {}\r\n", self.host));
        request.push_str("Accept: application/json\r\n");

        for (name, value) in &self.headers {
            request.push_str(&format!("{name}: {value}\r\n"));
        }

        if let Some(body) = &self.body {
            request.push_str(&format!("Content-Length: {}\r\n", body.len()));
        } else if self.force_content_length {
            request.push_str("Content-Length: 0\r\n");
        }

        request.push_str("Connection: close\r\n\r\n");

        if let Some(body) = &self.body {
            request.push_str(body);
        }

        request.into_bytes()
    }
}
