//! HTTP API for the hive.
//!
//! Every route except `/health` acts on behalf of the user named by the
//! `x-user-id` header (display name in `x-user-name`, or derived from
//! `x-user-email`). Sign-in happens in front of the node; the hive trusts
//! these headers.

use crate::error::Error;
use crate::identity::Actor;
use crate::models::{Group, Member, Vote};
use crate::node::HiveState;
use crate::voting::DeletionOutcome;
use crate::ws::ws_votes_handler;
use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use colmeia_quorum::ActionKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

type AppState = Arc<HiveState>;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the user's display name.
pub const USER_NAME_HEADER: &str = "x-user-name";
/// Header carrying the user's e-mail, used for the name when none is given.
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    // CORS layer for the mobile web build
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        // Groups
        .route("/api/v1/groups", get(list_groups).post(create_group))
        .route("/api/v1/groups/join", post(join_group))
        .route("/api/v1/groups/:group_id/members", get(list_members))
        .route("/api/v1/groups/:group_id/quorum/:kind", get(get_quorum))
        // Destructive actions (vote or direct, by group size)
        .route("/api/v1/groups/:group_id/deletions", post(request_deletion))
        // Votes
        .route(
            "/api/v1/groups/:group_id/votes",
            get(list_votes).post(create_vote),
        )
        .route(
            "/api/v1/groups/:group_id/votes/:vote_id",
            get(get_vote).delete(reject_vote),
        )
        .route(
            "/api/v1/groups/:group_id/votes/:vote_id/ballot",
            post(add_ballot).delete(remove_ballot),
        )
        .route(
            "/api/v1/groups/:group_id/votes/:vote_id/cancel",
            post(cancel_vote),
        )
        // Live pending-vote feed
        .route("/api/v1/groups/:group_id/ws/votes", get(ws_votes_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Error response: the status code derived from the error plus a JSON body.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::NotMember | Error::NotCreator | Error::CreatorCannotRemove => {
                StatusCode::FORBIDDEN
            }
            Error::GroupNotFound(_) | Error::VoteNotFound | Error::InvalidInviteCode => {
                StatusCode::NOT_FOUND
            }
            Error::AlreadyMember
            | Error::GroupDeleting(_)
            | Error::VoteAlreadyResolved
            | Error::DuplicateVote
            | Error::NotVoted
            | Error::DuplicatePendingVote => StatusCode::CONFLICT,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Config(_) | Error::Storage(_) | Error::Serialization(_) | Error::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = if self.0.is_precondition() {
            self.0.to_string()
        } else {
            tracing::error!("Request failed: {}", self.0);
            "internal error".to_string()
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// The acting user, taken from the identity headers.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Actor);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        let name = header(USER_NAME_HEADER);
        let actor = if name.trim().is_empty() {
            Actor::from_email(header(USER_ID_HEADER), &header(USER_EMAIL_HEADER))?
        } else {
            Actor::new(header(USER_ID_HEADER), name)?
        };
        Ok(CurrentUser(actor))
    }
}

// --- Health ---

async fn health() -> &'static str {
    "OK"
}

// --- Groups ---

async fn list_groups(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> ApiResult<Vec<Group>> {
    Ok(Json(state.voting.groups().groups_for(&actor.user_id)?))
}

#[derive(Debug, Deserialize)]
struct CreateGroupRequest {
    name: String,
}

async fn create_group(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>), ApiError> {
    let group = state.voting.groups().create_group(&actor, &req.name)?;
    Ok((StatusCode::CREATED, Json(group)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinGroupRequest {
    invite_code: String,
}

async fn join_group(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<JoinGroupRequest>,
) -> ApiResult<Group> {
    Ok(Json(
        state.voting.groups().join_group(&actor, &req.invite_code)?,
    ))
}

async fn list_members(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(group_id): Path<String>,
) -> ApiResult<Vec<Member>> {
    let groups = state.voting.groups();
    groups.require_member(&group_id, &actor)?;
    Ok(Json(groups.members(&group_id)?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuorumResponse {
    kind: ActionKind,
    required: usize,
    total: usize,
    needs_voting: bool,
}

async fn get_quorum(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path((group_id, kind)): Path<(String, ActionKind)>,
) -> ApiResult<QuorumResponse> {
    state.voting.groups().require_member(&group_id, &actor)?;
    let quorum = state.voting.calculate_required_votes(&group_id, kind)?;
    Ok(Json(QuorumResponse {
        kind,
        required: quorum.required,
        total: quorum.total,
        needs_voting: colmeia_quorum::needs_voting(quorum.total),
    }))
}

// --- Destructive actions ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActionRequest {
    #[serde(rename = "type")]
    kind: ActionKind,
    /// Ignored for group deletion, which always targets the group itself.
    #[serde(default)]
    target_id: String,
    #[serde(default)]
    target_name: String,
}

async fn request_deletion(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(group_id): Path<String>,
    Json(req): Json<ActionRequest>,
) -> ApiResult<DeletionOutcome> {
    let outcome = state.voting.request_deletion(
        &actor,
        &group_id,
        req.kind,
        &req.target_id,
        &req.target_name,
    )?;
    Ok(Json(outcome))
}

// --- Votes ---

async fn list_votes(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(group_id): Path<String>,
) -> ApiResult<Vec<Vote>> {
    state.voting.groups().require_member(&group_id, &actor)?;
    Ok(Json(state.voting.pending_votes(&group_id)?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedVote {
    vote_id: String,
}

async fn create_vote(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(group_id): Path<String>,
    Json(req): Json<ActionRequest>,
) -> Result<(StatusCode, Json<CreatedVote>), ApiError> {
    let vote_id = state.voting.create_vote(
        &actor,
        &group_id,
        req.kind,
        &req.target_id,
        &req.target_name,
    )?;
    Ok((StatusCode::CREATED, Json(CreatedVote { vote_id })))
}

async fn get_vote(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path((group_id, vote_id)): Path<(String, String)>,
) -> ApiResult<Vote> {
    state.voting.groups().require_member(&group_id, &actor)?;
    Ok(Json(state.voting.vote(&group_id, &vote_id)?))
}

async fn add_ballot(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path((group_id, vote_id)): Path<(String, String)>,
) -> ApiResult<Vote> {
    Ok(Json(state.voting.add_vote(&actor, &group_id, &vote_id)?))
}

async fn remove_ballot(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path((group_id, vote_id)): Path<(String, String)>,
) -> ApiResult<Vote> {
    Ok(Json(state.voting.remove_vote(&actor, &group_id, &vote_id)?))
}

async fn cancel_vote(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path((group_id, vote_id)): Path<(String, String)>,
) -> ApiResult<Vote> {
    Ok(Json(state.voting.cancel_vote(&actor, &group_id, &vote_id)?))
}

async fn reject_vote(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path((group_id, vote_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.voting.reject_vote(&actor, &group_id, &vote_id)?;
    Ok(StatusCode::NO_CONTENT)
}
