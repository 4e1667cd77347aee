use crate::auth::{
    AuthError, AuthResponse, AuthRouterExt, AuthUser, LoginRequest, RegisterRequest, UserView,
};
use crate::AppState;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};

/// Creates the router for account endpoints
pub fn auth_routes() -> Router<AppState> {
    let authenticated = Router::new().route("/me", get(me)).with_auth();

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(authenticated)
}

/// Create an account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid registration"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let response = state.services.auth.register(payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    state.services.auth.login(payload).await.map(Json)
}

/// Current account
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserView),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("Bearer" = [])),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserView>, AuthError> {
    state.services.auth.me(&user.user_id).await.map(Json)
}
