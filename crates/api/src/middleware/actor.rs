//! Actor identity middleware for protected routes.
//!
//! Authentication happens at the gateway in front of this service. The
//! gateway forwards who is acting in `x-actor-id` and the granted
//! capabilities as a comma-separated `x-actor-capabilities` list.

use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tally_shared::types::ActorId;
use tally_shared::{Actor, AppError, Capability};

use crate::error::ApiError;

/// Header carrying the authenticated actor id.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

/// Header carrying the actor's granted capabilities.
pub const ACTOR_CAPABILITIES_HEADER: &str = "x-actor-capabilities";

/// Reads the actor from the request headers.
fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AppError> {
    let raw_id = headers
        .get(ACTOR_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthenticated(format!("{ACTOR_ID_HEADER} header is required")))?;
    let id: ActorId = raw_id
        .trim()
        .parse()
        .map_err(|_| AppError::Unauthenticated(format!("{ACTOR_ID_HEADER} must be a UUID")))?;

    let capabilities = headers
        .get(ACTOR_CAPABILITIES_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(Capability::parse_list)
        .unwrap_or_default();

    Ok(Actor::new(id, capabilities))
}

/// Middleware that requires an actor identity on every request.
///
/// The actor is stored in request extensions for handlers to access.
pub async fn actor_middleware(mut request: Request, next: Next) -> Response {
    match actor_from_headers(request.headers()) {
        Ok(actor) => {
            request.extensions_mut().insert(actor);
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Extractor for the acting actor.
///
/// ```ignore
/// async fn handler(actor: CurrentActor) -> ApiResult<()> {
///     actor.require(Capability::PostEntries)?;
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

impl CurrentActor {
    /// Returns the actor id.
    #[must_use]
    pub fn id(&self) -> ActorId {
        self.0.id
    }

    /// Fails with `Forbidden` unless the actor holds the capability.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` naming the missing capability.
    pub fn require(&self, capability: Capability) -> Result<(), ApiError> {
        if self.0.has(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden(capability.to_string()).into())
        }
    }
}

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(actor) = parts.extensions.get::<Actor>() {
            return Ok(Self(actor.clone()));
        }
        actor_from_headers(&parts.headers)
            .map(Self)
            .map_err(ApiError::from)
    }
}
