//! Session-cookie extractors resolving the request's viewer.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use time::OffsetDateTime;

use crate::domain::entities::UserRecord;
use crate::presentation::views::{PageShell, render_not_found_response};

use super::HttpState;

pub const SESSION_COOKIE: &str = "blogicum_session";
pub const CSRF_COOKIE: &str = "blogicum_csrftoken";

/// The CSRF token the middleware issued (or found) for this request.
#[derive(Debug, Clone, Default)]
pub struct CsrfToken(pub String);

impl CsrfToken {
    /// Double-submit check: the hidden form field must echo the cookie.
    pub fn matches(&self, submitted: &str) -> bool {
        !self.0.is_empty() && self.0 == submitted
    }
}

impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<CsrfToken>().cloned().unwrap_or_default())
    }
}

/// Extractor that requires authentication. Unauthenticated requests are
/// redirected to the login page with the original path as `next`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

impl FromRequestParts<HttpState> for CurrentUser {
    type Rejection = LoginRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        let redirect = LoginRedirect {
            next: parts.uri.path().to_string(),
        };

        let Some(token) = cookie_value(&parts.headers, SESSION_COOKIE) else {
            return Err(redirect);
        };

        let now = OffsetDateTime::now_utc();
        match state.sessions.find_session_user(&token, now).await {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            _ => Err(redirect),
        }
    }
}

/// Optional variant: resolves to `None` instead of redirecting.
pub struct MaybeUser(pub Option<UserRecord>);

impl FromRequestParts<HttpState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = cookie_value(&parts.headers, SESSION_COOKIE) else {
            return Ok(MaybeUser(None));
        };

        let now = OffsetDateTime::now_utc();
        match state.sessions.find_session_user(&token, now).await {
            Ok(user) => Ok(MaybeUser(user)),
            Err(_) => Ok(MaybeUser(None)),
        }
    }
}

/// Extractor gating the admin panel. Anonymous requesters go to login;
/// authenticated non-staff requesters get the not-found page so the panel's
/// existence is not confirmed to them.
pub struct StaffUser(pub UserRecord);

impl FromRequestParts<HttpState> for StaffUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        if !user.is_staff {
            let csrf = parts
                .extensions
                .get::<CsrfToken>()
                .cloned()
                .unwrap_or_default();
            let shell = PageShell::new(Some(&user), csrf.0);
            return Err(render_not_found_response(shell));
        }

        Ok(StaffUser(user))
    }
}

/// Rejection carrying the login redirect for a protected route.
#[derive(Debug)]
pub struct LoginRedirect {
    next: String,
}

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        Redirect::to(&format!("/auth/login/?next={}", self.next)).into_response()
    }
}

/// Pull one cookie out of the request's `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .map(str::trim)
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let value = split.next()?.trim();
            if key == name { Some(value.to_string()) } else { None }
        })
}

/// Only local absolute paths are valid `next` targets; anything else falls
/// back to the caller's default.
pub fn safe_next_target(next: &str) -> Option<&str> {
    if next.starts_with('/') && !next.starts_with("//") {
        Some(next)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_targets_must_be_local_paths() {
        assert_eq!(safe_next_target("/posts/create/"), Some("/posts/create/"));
        assert_eq!(safe_next_target("https://evil.example"), None);
        assert_eq!(safe_next_target("//evil.example"), None);
        assert_eq!(safe_next_target(""), None);
    }
}
