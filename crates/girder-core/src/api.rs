//! Typed shapes for the REST backend.
//!
//! Nothing here performs I/O. Requests are described as [`OutboundRequest`]
//! values a transport can send as-is; bodies are plain JSON objects with no
//! envelope and no pagination. There is no retry policy and no idempotency
//! key: a request is sent once and its failure is reported, not repaired.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Coded, ErrorCode};
use crate::session::{AuthError, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    ListNews,
    ListJobs,
    CreateNews,
    ApplyJob,
    EmployerPostJob,
    JobApply,
}

impl Endpoint {
    pub const ALL: [Self; 6] = [
        Self::ListNews,
        Self::ListJobs,
        Self::CreateNews,
        Self::ApplyJob,
        Self::EmployerPostJob,
        Self::JobApply,
    ];

    #[must_use]
    pub const fn method(self) -> Method {
        match self {
            Self::ListNews | Self::ListJobs => Method::Get,
            Self::CreateNews | Self::ApplyJob | Self::EmployerPostJob | Self::JobApply => {
                Method::Post
            }
        }
    }

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::ListNews | Self::CreateNews => "/news",
            Self::ListJobs => "/job",
            Self::ApplyJob => "/apply-job",
            Self::EmployerPostJob => "/employer/post-job",
            Self::JobApply => "/job/apply",
        }
    }

    #[must_use]
    pub const fn takes_body(self) -> bool {
        matches!(self.method(), Method::Post)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    pub employment_type: String,
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub job_id: String,
    pub applicant_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
}

/// A payload that knows which of its fields the backend requires.
pub trait RequestBody: Serialize {
    fn required_fields(&self) -> Vec<(&'static str, &str)>;

    /// # Errors
    ///
    /// [`ApiError::MissingField`] for the first blank required field.
    fn validate(&self) -> Result<(), ApiError> {
        match self
            .required_fields()
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
        {
            Some((field, _)) => Err(ApiError::MissingField { field }),
            None => Ok(()),
        }
    }
}

impl RequestBody for NewsItem {
    fn required_fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("title", self.title.as_str()),
            ("content", self.content.as_str()),
            ("author", self.author.as_str()),
        ]
    }
}

impl RequestBody for JobPosting {
    fn required_fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("title", self.title.as_str()),
            ("company", self.company.as_str()),
            ("location", self.location.as_str()),
            ("description", self.description.as_str()),
            ("employmentType", self.employment_type.as_str()),
        ]
    }
}

impl RequestBody for JobApplication {
    fn required_fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("jobId", self.job_id.as_str()),
            ("applicantName", self.applicant_name.as_str()),
            ("email", self.email.as_str()),
        ]
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("{endpoint} does not take a request body")]
    UnexpectedBody { endpoint: Endpoint },

    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Coded for ApiError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::Auth(e) => e.code(),
            Self::MissingField { .. } | Self::UnexpectedBody { .. } => ErrorCode::InvalidContent,
            Self::Encode(_) => ErrorCode::InternalUnexpected,
        }
    }
}

/// A fully described request, ready for a transport to send once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundRequest {
    pub endpoint: Endpoint,
    pub method: Method,
    pub path: &'static str,
    pub authorization: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl OutboundRequest {
    /// Describe a bodyless request.
    ///
    /// # Errors
    ///
    /// [`ApiError::Auth`] when the session has no valid token at `now`, and
    /// [`ApiError::MissingField`] for endpoints that need a body.
    pub fn get(endpoint: Endpoint, session: &Session, now: DateTime<Utc>) -> Result<Self, ApiError> {
        if endpoint.takes_body() {
            return Err(ApiError::MissingField { field: "body" });
        }
        Ok(Self {
            endpoint,
            method: endpoint.method(),
            path: endpoint.path(),
            authorization: session.authorization_header(now)?,
            body: None,
        })
    }

    /// Describe a request with a validated JSON body.
    ///
    /// # Errors
    ///
    /// [`ApiError::Auth`], [`ApiError::MissingField`] for a blank required
    /// field, [`ApiError::UnexpectedBody`] for GET endpoints.
    pub fn with_body<B: RequestBody>(
        endpoint: Endpoint,
        session: &Session,
        now: DateTime<Utc>,
        body: &B,
    ) -> Result<Self, ApiError> {
        if !endpoint.takes_body() {
            return Err(ApiError::UnexpectedBody { endpoint });
        }
        body.validate()?;
        let authorization = session.authorization_header(now)?;
        let body = serde_json::to_value(body)?;
        tracing::debug!(%endpoint, "request described");
        Ok(Self {
            endpoint,
            method: endpoint.method(),
            path: endpoint.path(),
            authorization,
            body: Some(body),
        })
    }
}

/// A non-2xx response from the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{endpoint} failed with status {status}: {message}")]
pub struct BackendError {
    pub endpoint: Endpoint,
    pub status: u16,
    pub message: String,
}

impl BackendError {
    /// Turn a raw status into `Ok(())` for 2xx and a [`BackendError`] otherwise.
    ///
    /// # Errors
    ///
    /// Any status outside `200..300`.
    pub fn check(endpoint: Endpoint, status: u16, message: impl Into<String>) -> Result<(), Self> {
        if (200..300).contains(&status) {
            return Ok(());
        }
        Err(Self {
            endpoint,
            status,
            message: message.into(),
        })
    }
}

impl Coded for BackendError {
    fn code(&self) -> ErrorCode {
        match self.status {
            401 | 403 => ErrorCode::SessionExpired,
            404 => ErrorCode::ContentNotFound,
            _ => ErrorCode::BackendRejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, Notice};
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0)
            .single()
            .expect("ts")
    }

    fn session() -> Session {
        Session::login_for("ana", "tok-9", at(0), Duration::minutes(60))
    }

    #[test]
    fn endpoints_match_backend_routes() {
        let routes: Vec<String> = Endpoint::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(
            routes,
            [
                "GET /news",
                "GET /job",
                "POST /news",
                "POST /apply-job",
                "POST /employer/post-job",
                "POST /job/apply",
            ]
        );
    }

    #[test]
    fn bodies_use_camel_case_without_envelope() {
        let application = JobApplication {
            job_id: "j-1".to_string(),
            applicant_name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            phone: None,
            cover_letter: Some("10 years on site".to_string()),
            resume_url: None,
        };
        let req = OutboundRequest::with_body(Endpoint::JobApply, &session(), at(1), &application)
            .expect("request");
        let body = req.body.expect("body");
        assert_eq!(body["jobId"], "j-1");
        assert_eq!(body["coverLetter"], "10 years on site");
        assert!(body.get("phone").is_none());
        assert_eq!(req.authorization, "Bearer tok-9");
        assert_eq!(req.path, "/job/apply");
    }

    #[test]
    fn news_items_parse_from_backend_json() {
        let raw = r#"{"id":"n1","title":"Steel prices","content":"Up again","author":"ed","createdAt":"2024-03-01T09:00:00Z"}"#;
        let item: NewsItem = serde_json::from_str(raw).expect("parse");
        assert_eq!(item.id.as_deref(), Some("n1"));
        assert!(item.image_url.is_none());
    }

    #[test]
    fn blank_required_field_is_a_validation_error() {
        let news = NewsItem {
            id: None,
            title: "  ".to_string(),
            content: "x".to_string(),
            author: "ed".to_string(),
            image_url: None,
            created_at: at(0),
        };
        let err = OutboundRequest::with_body(Endpoint::CreateNews, &session(), at(1), &news)
            .unwrap_err();
        assert!(matches!(err, ApiError::MissingField { field: "title" }));
        assert_eq!(Notice::from_error(&err).kind, ErrorKind::Validation);
    }

    #[test]
    fn expired_session_blocks_requests() {
        let err = OutboundRequest::get(Endpoint::ListJobs, &session(), at(7_200)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SessionExpired);
    }

    #[test]
    fn get_endpoints_reject_bodies() {
        let news = NewsItem {
            id: None,
            title: "t".to_string(),
            content: "c".to_string(),
            author: "a".to_string(),
            image_url: None,
            created_at: at(0),
        };
        let err = OutboundRequest::with_body(Endpoint::ListNews, &session(), at(1), &news)
            .unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedBody { .. }));
    }

    #[test]
    fn backend_status_maps_to_taxonomy() {
        assert!(BackendError::check(Endpoint::ListNews, 204, "").is_ok());
        let missing = BackendError::check(Endpoint::ApplyJob, 404, "job gone").unwrap_err();
        assert_eq!(missing.code().kind(), ErrorKind::NotFound);
        let down = BackendError::check(Endpoint::ListNews, 503, "unavailable").unwrap_err();
        assert_eq!(down.code().kind(), ErrorKind::Network);
        let auth = BackendError::check(Endpoint::ListNews, 401, "expired").unwrap_err();
        assert_eq!(auth.code().kind(), ErrorKind::Authentication);
    }
}
