// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Extension, Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::application::admin_service::AdminService;
use crate::application::authorization_filter::AuthorizationFilter;
use crate::application::graph_service::{GraphService, ServiceError};
use crate::application::requests::{
    CreateNodesRequest, CreateUserRequest, EdgesRequest, LoginRequest, QueryRequest, RequestError,
    ShareNodesRequest, UpdateNodesRequest, UserNodeRequest, UsersRequest,
};
use crate::application::responses::{GraphResponse, UserResponse, UsersResponse};
use crate::application::session_service::{IssuedSession, LoginError, SessionService};
use crate::domain::errors::{AuthError, RegistryError};
use crate::domain::identity::RequestContext;
use crate::domain::store::{StoreError, UserRelation};

#[derive(Clone)]
pub struct AppState {
    pub filter: Arc<AuthorizationFilter>,
    pub sessions: Arc<SessionService>,
    pub graph: Arc<GraphService>,
    pub admin: Arc<AdminService>,
}

pub fn app(state: AppState) -> Router {
    let authenticated = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/logout/all", post(logout_everywhere))
        .route("/auth/check", get(check))
        .route(
            "/graph/nodes",
            post(query_nodes).patch(update_nodes),
        )
        .route("/graph/nodes/{parent}", put(create_nodes))
        .route("/graph/edges", put(add_edges).delete(remove_edges))
        .route("/user/node", put(create_user_node))
        .route("/user/nodes/{relation}", post(user_nodes))
        .route("/user/share", put(share_nodes).delete(unshare_nodes))
        .route("/user/name/{username}", get(user_by_name))
        .route("/user/uid/{uid}", get(user_by_uid))
        .route("/admin/user", put(admin_create_user))
        .route("/admin/users", patch(admin_update_users))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/auth/login", post(login))
        .route("/health/status", get(health))
        .merge(authenticated)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolve the bearer token into a [`RequestContext`] extension.
async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let ctx = state.filter.authenticate_bearer(header.as_deref()).await?;
    debug!(uid = %ctx.uid, path = %request.uri().path(), "Authenticated request");
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

/// HTTP projection of every failure the handlers can see. Bodies are plain
/// text and never echo descriptor contents.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(cause: &dyn std::fmt::Display) -> Self {
        error!(error = %cause, "Request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Forbidden => Self::new(StatusCode::FORBIDDEN, err.reason()),
            AuthError::RegistryUnavailable(cause) => Self::internal(&cause),
            _ => Self::new(StatusCode::UNAUTHORIZED, err.reason()),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        Self::internal(&err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(message) => Self::new(StatusCode::NOT_FOUND, message),
            StoreError::Invalid(message) => Self::new(StatusCode::BAD_REQUEST, message),
            StoreError::Backend(_) => Self::internal(&err),
        }
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Auth(e) => e.into(),
            RequestError::Invalid(message) => Self::new(StatusCode::BAD_REQUEST, message),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Auth(e) => e.into(),
            ServiceError::BadRequest(message) => Self::new(StatusCode::BAD_REQUEST, message),
            ServiceError::Store(e) => e.into(),
        }
    }
}

impl From<LoginError> for ApiError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::InvalidCredentials => Self::new(StatusCode::UNAUTHORIZED, err.to_string()),
            LoginError::Throttled => Self::new(StatusCode::TOO_MANY_REQUESTS, err.to_string()),
            LoginError::Registry(e) => e.into(),
            LoginError::Store(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<IssuedSession> {
    let Json(request) = body?;
    request.validate()?;
    let session = state.sessions.login(&request.username, &request.password).await?;
    Ok(Json(session))
}

async fn logout(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<&'static str, ApiError> {
    state.sessions.logout(&ctx).await?;
    Ok("OK")
}

async fn logout_everywhere(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> ApiResult<serde_json::Value> {
    let purged = state.sessions.logout_everywhere(&ctx).await?;
    Ok(Json(json!({ "sessions": purged })))
}

async fn check() -> &'static str {
    "OK"
}

async fn query_nodes(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<GraphResponse> {
    let Json(request) = body?;
    Ok(Json(state.graph.query(&ctx, request).await?))
}

async fn update_nodes(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<UpdateNodesRequest>, JsonRejection>,
) -> ApiResult<GraphResponse> {
    let Json(request) = body?;
    Ok(Json(state.graph.update_nodes(&ctx, request).await?))
}

async fn create_nodes(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(parent): Path<String>,
    body: Result<Json<CreateNodesRequest>, JsonRejection>,
) -> ApiResult<GraphResponse> {
    let Json(mut request) = body?;
    request.parent = parent;
    Ok(Json(state.graph.create_nodes(&ctx, request).await?))
}

async fn add_edges(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<EdgesRequest>, JsonRejection>,
) -> ApiResult<GraphResponse> {
    let Json(request) = body?;
    Ok(Json(state.graph.add_edges(&ctx, request).await?))
}

async fn remove_edges(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<EdgesRequest>, JsonRejection>,
) -> ApiResult<GraphResponse> {
    let Json(request) = body?;
    Ok(Json(state.graph.remove_edges(&ctx, request).await?))
}

async fn create_user_node(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<UserNodeRequest>, JsonRejection>,
) -> ApiResult<GraphResponse> {
    let Json(request) = body?;
    Ok(Json(state.graph.create_user_node(&ctx, request).await?))
}

async fn user_nodes(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(relation): Path<String>,
) -> ApiResult<GraphResponse> {
    let relation: UserRelation = relation.parse()?;
    Ok(Json(state.graph.user_nodes(&ctx, relation).await?))
}

async fn share_nodes(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<ShareNodesRequest>, JsonRejection>,
) -> ApiResult<GraphResponse> {
    let Json(request) = body?;
    Ok(Json(state.graph.share(&ctx, request).await?))
}

async fn unshare_nodes(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<ShareNodesRequest>, JsonRejection>,
) -> ApiResult<GraphResponse> {
    let Json(request) = body?;
    Ok(Json(state.graph.unshare(&ctx, request).await?))
}

async fn user_by_name(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(username): Path<String>,
) -> ApiResult<UserResponse> {
    Ok(Json(state.graph.find_user_by_name(&ctx, &username).await?))
}

async fn user_by_uid(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(uid): Path<String>,
) -> ApiResult<UserResponse> {
    Ok(Json(state.graph.find_user_by_uid(&ctx, &uid).await?))
}

async fn admin_create_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<UserResponse> {
    let Json(request) = body?;
    Ok(Json(state.admin.create_user(&ctx, request).await?))
}

async fn admin_update_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<UsersRequest>, JsonRejection>,
) -> ApiResult<UsersResponse> {
    let Json(request) = body?;
    Ok(Json(state.admin.update_users(&ctx, request).await?))
}
