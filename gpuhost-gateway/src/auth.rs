//! Bearer-token authorization.
//!
//! A caller presents one token, either as `Authorization: Bearer <token>` or
//! as a `?key=<token>` query parameter. When both are sent, the first one
//! that resolves to an [`Access`] level wins. Each route declares the
//! [`Scope`] it needs.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts},
};
use gpuhost_core::ClanRole;
use tracing::warn;

use crate::{error::GatewayError, state::AppState};

/// What a resolved token is allowed to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Access {
    /// The agent's own operator token.
    Operator,
    Admin,
    WorkerJoin,
    ClientAccess,
}

impl From<ClanRole> for Access {
    fn from(role: ClanRole) -> Self {
        match role {
            ClanRole::Admin => Self::Admin,
            ClanRole::WorkerJoin => Self::WorkerJoin,
            // Any clan role added later gets the narrowest access.
            _ => Self::ClientAccess,
        }
    }
}

/// Classes of route, each granted to a fixed set of [`Access`] levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Lock, unlock, submit, and device info.
    Agent,
    /// Forming the clan.
    ClanCreate,
    /// Joining the clan as a worker.
    ClanJoin,
    /// Clan status and completions.
    ClanRead,
}

impl Access {
    #[must_use]
    pub fn permits(self, scope: Scope) -> bool {
        match scope {
            Scope::Agent => matches!(self, Self::Operator | Self::Admin | Self::ClientAccess),
            Scope::ClanCreate => self == Self::Operator,
            Scope::ClanJoin => self == Self::WorkerJoin,
            Scope::ClanRead => matches!(self, Self::Admin | Self::ClientAccess),
        }
    }
}

/// Extractor for an authenticated caller.
///
/// Rejects with [`GatewayError::Forbidden`] when no token is presented or the
/// token is unknown. Handlers then call [`Caller::require`] for their scope.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Access);

impl Caller {
    /// Checks that this caller may use routes of `scope`.
    ///
    /// # Errors
    /// Returns [`GatewayError::Forbidden`] otherwise.
    pub fn require(self, scope: Scope) -> Result<Access, GatewayError> {
        if self.0.permits(scope) {
            Ok(self.0)
        } else {
            warn!(access = ?self.0, ?scope, "credential not valid for route");
            Err(GatewayError::Forbidden)
        }
    }
}

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let candidates = presented_tokens(parts);
        if candidates.is_empty() {
            return Err(GatewayError::Forbidden);
        }
        match candidates.iter().find_map(|token| state.resolve(token)) {
            Some(access) => Ok(Self(access)),
            None => {
                warn!(path = %parts.uri.path(), presented = candidates.len(), "unknown credential presented");
                Err(GatewayError::Forbidden)
            }
        }
    }
}

/// Every token the request carries: the percent-decoded `key` query
/// parameter first, then the bearer header.
fn presented_tokens(parts: &Parts) -> Vec<String> {
    let from_query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(mut params)| params.remove("key"));
    let from_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_owned());
    from_query.into_iter().chain(from_header).filter(|token| !token.is_empty()).collect()
}
