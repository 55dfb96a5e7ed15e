// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP request guards
//!
//! - [`basic_auth`]: optional HTTP basic authentication over every route.
//! - [`require_token`]: the process token on every privileged route, read
//!   from the configured header first, then from the `token` query parameter.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::Arc;

use super::api::ApiResponse;
use crate::domain::token::ProcessToken;

const BASIC_REALM: &str = "Basic realm=\"Authorization Required\"";

#[derive(Clone)]
pub struct BasicAuth {
    credentials: Arc<(String, String)>,
}

impl BasicAuth {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Arc::new((user.into(), password.into())),
        }
    }

    /// Check an `Authorization` header value.
    pub fn accepts(&self, authorization: &str) -> bool {
        let Some(encoded) = authorization.strip_prefix("Basic ") else {
            return false;
        };
        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return false;
        };
        match decoded.split_once(':') {
            Some((user, password)) => {
                user == self.credentials.0 && password == self.credentials.1
            }
            None => false,
        }
    }
}

pub async fn basic_auth(
    State(auth): State<BasicAuth>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(|h| auth.accepts(h))
        .unwrap_or(false);

    if authorized {
        return next.run(request).await;
    }
    let mut response = (StatusCode::UNAUTHORIZED, "Not Authorized").into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(BASIC_REALM));
    response
}

#[derive(Clone)]
pub struct TokenGuard {
    token: ProcessToken,
    header: Option<String>,
}

impl TokenGuard {
    pub fn new(token: ProcessToken, header: &str) -> Self {
        Self {
            token,
            header: (!header.is_empty()).then(|| header.to_string()),
        }
    }

    fn presented(&self, request: &Request<Body>) -> Option<String> {
        let from_header = self
            .header
            .as_deref()
            .and_then(|name| request.headers().get(name))
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        from_header.or_else(|| {
            request.uri().query().and_then(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .find(|(key, _)| key == "token")
                    .map(|(_, value)| value.into_owned())
            })
        })
    }
}

pub async fn require_token(
    State(guard): State<TokenGuard>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match guard.presented(&request) {
        Some(token) if guard.token.matches(&token) => next.run(request).await,
        _ => ApiResponse::error("Invalid token").into_response(),
    }
}
