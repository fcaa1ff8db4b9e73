use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Transport I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS negotiation failed: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("Malformed HTTP response: {0}")]
    MalformedResponse(String),

    #[error("The server response is missing the expected `{0}` field")]
    MissingField(&'static str),

    #[error("The operation requires an authenticated session")]
    NotAuthenticated,

    #[error("The API request failed: {0}")]
    Request(String),
}
