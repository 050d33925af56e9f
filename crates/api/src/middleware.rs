use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use casebridge_auth::SessionToken;

use crate::app::errors::ApiError;
use crate::app::state::AppState;
use crate::context::CurrentUser;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "casebridge_session";

/// Resolve the session (cookie or `Authorization: Bearer`) into a
/// [`CurrentUser`] extension, or answer 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match authenticate(&state, req.headers()).await {
        Ok(current) => {
            req.extensions_mut().insert(current);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, ApiError> {
    let token = extract_token(headers).ok_or(ApiError::Unauthenticated)?;

    let record = state
        .sessions
        .resolve(&token)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    let Some(user) = state.db.users().find(record.user_id).await? else {
        tracing::info!(user_id = %record.user_id, "session refers to a deleted user");
        state.sessions.revoke(&token).await?;
        return Err(ApiError::Unauthenticated);
    };

    Ok(CurrentUser::new(user, token))
}

/// Bearer header wins over the cookie when both are present.
pub fn extract_token(headers: &HeaderMap) -> Option<SessionToken> {
    bearer_token(headers)
        .or_else(|| cookie_value(headers, SESSION_COOKIE))
        .and_then(SessionToken::parse)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then_some(value)
        })
}

/// `Set-Cookie` value opening a session.
pub fn session_cookie(token: &SessionToken, ttl: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token.as_str(),
        ttl.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// One structured log line per request.
pub async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if status.is_server_error() {
        tracing::error!(%method, %path, status = status.as_u16(), elapsed_ms, "request");
    } else {
        tracing::info!(%method, %path, status = status.as_u16(), elapsed_ms, "request");
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn token_is_read_from_cookie() {
        let token = SessionToken::generate();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={}", token.as_str()))
                .unwrap(),
        );
        assert_eq!(extract_token(&headers), Some(token));
    }

    #[test]
    fn bearer_header_takes_precedence() {
        let bearer = SessionToken::generate();
        let cookie = SessionToken::generate();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", bearer.as_str())).unwrap(),
        );
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{SESSION_COOKIE}={}", cookie.as_str())).unwrap(),
        );
        assert_eq!(extract_token(&headers), Some(bearer));
    }

    #[test]
    fn malformed_tokens_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer nope"));
        assert_eq!(extract_token(&headers), None);
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }

    #[test]
    fn cookies_carry_expected_attributes() {
        let token = SessionToken::generate();
        let cookie = session_cookie(&token, Duration::from_secs(60), true);
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=60"));
        assert!(cookie.ends_with("; Secure"));
        assert!(clear_session_cookie(false).contains("Max-Age=0"));
    }
}
