//! Shared handler state and session extractors.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::errors::ApiError;
use crate::auth::{bearer_token, AuthError, AuthService, Profile};
use crate::catalog::CatalogService;
use crate::config::AppConfig;
use crate::realtime::RealtimeContext;
use crate::store::BackingStore;

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub auth: AuthService,
    pub realtime: Arc<RealtimeContext>,
    /// Open WebSocket sessions
    pub sessions: Arc<AtomicUsize>,
    /// Outbound queue length per WebSocket session
    pub outbound_capacity: usize,
}

impl AppState {
    /// Wire services over one store. The realtime context starts
    /// disconnected; call `realtime.start()` before serving.
    pub fn new(store: Arc<dyn BackingStore>, config: &AppConfig) -> Self {
        Self {
            catalog: CatalogService::new(Arc::clone(&store)),
            auth: AuthService::new(Arc::clone(&store), &config.auth),
            realtime: Arc::new(RealtimeContext::new(store, &config.realtime)),
            sessions: Arc::new(AtomicUsize::new(0)),
            outbound_capacity: config.realtime.channel_capacity,
        }
    }
}

fn token_from(parts: &Parts) -> Result<&str, ApiError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| ApiError::from(AuthError::AuthenticationRequired))
}

/// Any signed-in profile
#[derive(Debug, Clone)]
pub struct Session(pub Profile);

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = token_from(parts)?;
        let profile = state.auth.current_profile(token).await?;
        Ok(Session(profile))
    }
}

/// A signed-in admin
#[derive(Debug, Clone)]
pub struct AdminSession(pub Profile);

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = token_from(parts)?;
        let profile = state.auth.require_admin(token).await?;
        Ok(AdminSession(profile))
    }
}
