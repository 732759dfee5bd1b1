use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use uuid::Uuid;

/// Request context containing the authenticated subject information.
///
/// Populated by the transport layer's authentication middleware; the core
/// only consumes it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id assigned to the request.
    pub request_id: String,
    /// Authenticated subject id.
    pub subject_id: Uuid,
    /// Subject email.
    pub email: String,
    /// Primary role, if any.
    pub role: Option<String>,
    /// Full role set.
    pub roles: Vec<String>,
}

impl RequestContext {
    /// Build a request context from its parts.
    pub fn new(
        request_id: String,
        subject_id: Uuid,
        email: String,
        role: Option<String>,
        roles: Vec<String>,
    ) -> Self {
        Self {
            request_id,
            subject_id,
            email,
            role,
            roles,
        }
    }

    /// Check if the subject carries a specific role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
            || self.role.as_deref().map(|r| r == role).unwrap_or(false)
    }

    /// Check if the subject carries any of the specified roles.
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|r| self.has_role(r))
    }
}

/// Extract RequestContext from Axum extensions
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or((StatusCode::UNAUTHORIZED, "Request context not found"))
    }
}
