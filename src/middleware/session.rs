use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// HTTP header carrying the caller's session
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Extension type identifying whose profile and memos a request touches
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Starts a new anonymous session
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a request's session id was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolution {
    /// The client sent a well-formed id
    Resumed(SessionId),
    /// No id was sent
    Started(SessionId),
    /// An id was sent but could not be parsed; a fresh one replaces it
    Replaced { sent: String, session: SessionId },
}

impl Resolution {
    fn from_headers(headers: &HeaderMap) -> Self {
        let Some(raw) = headers.get(SESSION_ID_HEADER) else {
            return Resolution::Started(SessionId::new());
        };

        match raw.to_str().ok().map(|s| Uuid::parse_str(s.trim())) {
            Some(Ok(uuid)) => Resolution::Resumed(SessionId(uuid)),
            _ => Resolution::Replaced {
                sent: String::from_utf8_lossy(raw.as_bytes()).chars().take(64).collect(),
                session: SessionId::new(),
            },
        }
    }

    fn session(&self) -> &SessionId {
        match self {
            Resolution::Resumed(session)
            | Resolution::Started(session)
            | Resolution::Replaced { session, .. } => session,
        }
    }
}

/// Middleware that resolves the session for a request.
///
/// A well-formed `x-session-id` header resumes that session; a missing one
/// starts a new session and a malformed one is logged and replaced. The
/// resolved id is echoed on the response so clients can keep it.
pub async fn session_middleware(mut request: Request, next: Next) -> Response {
    let resolution = Resolution::from_headers(request.headers());
    match &resolution {
        Resolution::Resumed(_) => {}
        Resolution::Started(session) => {
            tracing::debug!(session_id = %session, "Starting new session");
        }
        Resolution::Replaced { sent, session } => {
            tracing::warn!(
                sent = %sent,
                session_id = %session,
                "Malformed session id, starting new session"
            );
        }
    }

    let session_id = resolution.session().clone();
    request.extensions_mut().insert(session_id.clone());

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(&session_id.as_str()) {
        response
            .headers_mut()
            .insert(SESSION_ID_HEADER, header_value);
    }

    response
}

/// Tracing span for an HTTP request, tagged with its session
pub fn make_span_with_session_id(request: &Request<Body>) -> tracing::Span {
    let session_id = request
        .extensions()
        .get::<SessionId>()
        .map(|id| id.as_str())
        .unwrap_or_else(|| "unknown".to_string());

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        session_id = %session_id,
    )
}
