use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::{header, HeaderMap, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get, post},
    Json, Router,
};
use reeltrack_client::{
    CatalogCoordinator, CoordinatorError, CounterStatus, CounterSync, LoginOutcome,
    RegisterOutcome, ServiceError, SessionManager,
};
use reeltrack_core::{CatalogError, CatalogItem, NewItem, Session, TimeFormat};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "reeltrack_session";
pub const LOGIN_PATH: &str = "/login";

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub catalog: Arc<CatalogCoordinator>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        login_page,
        login,
        register,
        logout,
        list_items,
        add_item,
        update_progress,
        remove_item,
        counter_status,
        resync_counter,
    ),
    components(
        schemas(
            LoginRequest,
            LoginResponse,
            RegisterRequest,
            MessageResponse,
            ProgressUpdate,
            ItemResponse,
            RemoveResponse,
            CounterStatusResponse,
            CounterReport,
            reeltrack_core::CatalogItem,
            reeltrack_core::NewItem,
            reeltrack_core::ItemStatus,
            reeltrack_core::TimeFormat
        )
    )
)]
pub struct ApiDoc;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/items", get(list_items).post(add_item))
        .route("/items/:id", delete(remove_item))
        .route("/items/:id/progress", post(update_progress))
        .route("/counter", get(counter_status))
        .route("/counter/resync", post(resync_counter))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health_check))
        .route(LOGIN_PATH, get(login_page).post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Browser session id from the session cookie, if any.
fn session_cookie(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
}

/// Catalog routes are refused for unauthenticated callers, who are sent to
/// the login entry point instead.
async fn require_session<B>(
    State(state): State<AppState>,
    mut req: Request<B>,
    next: Next<B>,
) -> Response {
    match state.sessions.require(session_cookie(req.headers())) {
        Ok(session) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        Err(_) => Redirect::to(LOGIN_PATH).into_response(),
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<String>,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
            redirect: None,
        })
    }

    fn redirect(message: impl Into<String>, to: &str) -> Json<Self> {
        Json(Self {
            message: message.into(),
            redirect: Some(to.to_string()),
        })
    }
}

fn service_failure(err: ServiceError) -> Response {
    error!(role = %err.role(), error = %err, "backend service call failed");
    let status = if err.is_unavailable() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::BAD_GATEWAY
    };
    (status, MessageResponse::new(err.to_string())).into_response()
}

fn catalog_failure(err: CatalogError) -> Response {
    match err {
        CatalogError::ItemNotFound(_) => {
            (StatusCode::NOT_FOUND, MessageResponse::new(err.to_string())).into_response()
        }
        CatalogError::Storage(_) => {
            error!(error = %err, "catalog operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, MessageResponse::new("Catalog unavailable"))
                .into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "OK"))
)]
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}

#[utoipa::path(
    get,
    path = "/login",
    responses((status = 200, description = "Login entry point", body = MessageResponse))
)]
async fn login_page() -> impl IntoResponse {
    MessageResponse::new("Log in by posting username and password to /login")
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice")]
    username: String,
    password: String,
    #[serde(default)]
    time_format: Option<TimeFormat>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    username: String,
    welcome: String,
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session established", body = LoginResponse),
        (status = 401, description = "Credentials rejected", body = MessageResponse),
        (status = 503, description = "Auth service unavailable", body = MessageResponse)
    )
)]
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    let outcome = state
        .sessions
        .login(
            session_cookie(&headers),
            &payload.username,
            &payload.password,
            payload.time_format.unwrap_or_default(),
        )
        .await;

    match outcome {
        Ok(LoginOutcome::Authenticated {
            session_id,
            session,
            welcome,
        }) => {
            let cookie = format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax");
            (
                [(header::SET_COOKIE, cookie)],
                Json(LoginResponse {
                    username: session.username,
                    welcome,
                }),
            )
                .into_response()
        }
        Ok(LoginOutcome::Rejected { message }) => (
            StatusCode::UNAUTHORIZED,
            MessageResponse::redirect(message, LOGIN_PATH),
        )
            .into_response(),
        Err(err) => service_failure(err),
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    username: String,
    password: String,
    confirm_password: String,
}

#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = MessageResponse),
        (status = 400, description = "Registration rejected", body = MessageResponse)
    )
)]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> impl IntoResponse {
    match state
        .sessions
        .register(&payload.username, &payload.password, &payload.confirm_password)
        .await
    {
        Ok(RegisterOutcome::Registered { message }) => {
            (StatusCode::CREATED, MessageResponse::redirect(message, LOGIN_PATH)).into_response()
        }
        Ok(RegisterOutcome::Rejected { message }) => {
            (StatusCode::BAD_REQUEST, MessageResponse::new(message)).into_response()
        }
        Err(err) => service_failure(err),
    }
}

#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 200, description = "Session cleared", body = MessageResponse))
)]
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(session_id) = session_cookie(&headers) {
        state.sessions.logout(session_id);
    }
    let expired = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0");
    (
        [(header::SET_COOKIE, expired)],
        MessageResponse::redirect("Logged out", LOGIN_PATH),
    )
}

#[utoipa::path(
    get,
    path = "/items",
    responses(
        (status = 200, description = "Catalog items", body = Vec<CatalogItem>),
        (status = 303, description = "Not logged in, redirected to /login")
    )
)]
async fn list_items(State(state): State<AppState>) -> impl IntoResponse {
    match state.catalog.items() {
        Ok(items) => Json(items).into_response(),
        Err(err) => catalog_failure(err),
    }
}

/// Counter outcome attached to every mutation response.
#[derive(Serialize, ToSchema)]
pub struct CounterReport {
    #[schema(example = "synced")]
    state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl From<CounterSync> for CounterReport {
    fn from(sync: CounterSync) -> Self {
        match sync {
            CounterSync::Synced { count } => Self {
                state: "synced".to_string(),
                count: Some(count),
                expected: None,
                detail: None,
            },
            CounterSync::Drift { expected, detail } => Self {
                state: "drift".to_string(),
                count: None,
                expected: Some(expected),
                detail: Some(detail),
            },
            CounterSync::Skipped => Self {
                state: "skipped".to_string(),
                count: None,
                expected: None,
                detail: None,
            },
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ItemResponse {
    item: CatalogItem,
    counter: CounterReport,
}

#[utoipa::path(
    post,
    path = "/items",
    request_body = NewItem,
    responses(
        (status = 201, description = "Item added", body = ItemResponse),
        (status = 400, description = "Missing title", body = MessageResponse)
    )
)]
async fn add_item(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(draft): Json<NewItem>,
) -> impl IntoResponse {
    if draft.title.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, MessageResponse::new("Title is required.")).into_response();
    }

    match state.catalog.add_item(draft).await {
        Ok(added) => {
            tracing::info!(username = %session.username, id = added.value.id, "item added");
            (
                StatusCode::CREATED,
                Json(ItemResponse {
                    item: added.value,
                    counter: added.counter.into(),
                }),
            )
                .into_response()
        }
        Err(err) => catalog_failure(err),
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ProgressUpdate {
    #[schema(example = 45)]
    progress: u32,
}

#[utoipa::path(
    post,
    path = "/items/{id}/progress",
    request_body = ProgressUpdate,
    responses(
        (status = 200, description = "Progress updated", body = CatalogItem),
        (status = 404, description = "Unknown item", body = MessageResponse)
    ),
    params(("id" = u64, Path, description = "Item ID"))
)]
async fn update_progress(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(payload): Json<ProgressUpdate>,
) -> impl IntoResponse {
    match state.catalog.update_progress(id, payload.progress).await {
        Ok(item) => Json(item).into_response(),
        Err(err) => catalog_failure(err),
    }
}

#[derive(Serialize, ToSchema)]
pub struct RemoveResponse {
    removed: bool,
    counter: CounterReport,
}

#[utoipa::path(
    delete,
    path = "/items/{id}",
    responses(
        (status = 200, description = "Item removed", body = RemoveResponse),
        (status = 404, description = "Unknown item, counter untouched", body = RemoveResponse)
    ),
    params(("id" = u64, Path, description = "Item ID"))
)]
async fn remove_item(State(state): State<AppState>, Path(id): Path<u64>) -> impl IntoResponse {
    match state.catalog.remove_item(id).await {
        Ok(removed) => {
            let status = if removed.value {
                StatusCode::OK
            } else {
                StatusCode::NOT_FOUND
            };
            (
                status,
                Json(RemoveResponse {
                    removed: removed.value,
                    counter: removed.counter.into(),
                }),
            )
                .into_response()
        }
        Err(err) => catalog_failure(err),
    }
}

#[derive(Serialize, ToSchema)]
pub struct CounterStatusResponse {
    counter_name: String,
    count: u64,
    catalog_size: u64,
    in_sync: bool,
}

#[utoipa::path(
    get,
    path = "/counter",
    responses(
        (status = 200, description = "Remote counter compared with the catalog", body = CounterStatusResponse),
        (status = 503, description = "Counter service unavailable", body = MessageResponse)
    )
)]
async fn counter_status(State(state): State<AppState>) -> impl IntoResponse {
    match state.catalog.counter_status().await {
        Ok(CounterStatus {
            count,
            catalog_size,
            in_sync,
        }) => Json(CounterStatusResponse {
            counter_name: state.catalog.counter_name().to_string(),
            count,
            catalog_size,
            in_sync,
        })
        .into_response(),
        Err(CoordinatorError::Service(err)) => service_failure(err),
        Err(CoordinatorError::Catalog(err)) => catalog_failure(err),
    }
}

#[utoipa::path(
    post,
    path = "/counter/resync",
    responses((status = 200, description = "Counter recomputed from the catalog", body = CounterReport))
)]
async fn resync_counter(State(state): State<AppState>) -> impl IntoResponse {
    match state.catalog.resync().await {
        Ok(sync) => Json(CounterReport::from(sync)).into_response(),
        Err(err) => catalog_failure(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use reeltrack_client::{CoordinatorConfig, HubConfig, ServiceHub};
    use reeltrack_core::{MemoryCatalog, ServiceEndpoint, ServiceRole};
    use reeltrack_services::{spawn, AuthService, CalendarService, ClockService, CounterService};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tower::ServiceExt;

    fn state_for(config: HubConfig) -> AppState {
        let hub = ServiceHub::new(config);
        let sessions = Arc::new(SessionManager::new(hub.auth().clone(), hub.clock().clone()));
        let catalog = Arc::new(CatalogCoordinator::new(
            Arc::new(MemoryCatalog::new()),
            hub.counter().clone(),
            hub.calendar().clone(),
            CoordinatorConfig::default(),
        ));
        AppState { sessions, catalog }
    }

    async fn live_state() -> AppState {
        let mut config = HubConfig {
            timeout: Duration::from_secs(2),
            ..HubConfig::default()
        };
        for role in ServiceRole::ALL {
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            let endpoint = ServiceEndpoint::new(role, listener.local_addr().expect("addr").to_string());
            match role {
                ServiceRole::Auth => {
                    let auth = AuthService::new("server-test");
                    auth.register("alice", "secret");
                    spawn(listener, Arc::new(auth));
                    config.auth = endpoint;
                }
                ServiceRole::Calendar => {
                    spawn(listener, Arc::new(CalendarService));
                    config.calendar = endpoint;
                }
                ServiceRole::Clock => {
                    spawn(listener, Arc::new(ClockService));
                    config.clock = endpoint;
                }
                ServiceRole::Counter => {
                    spawn(listener, Arc::new(CounterService::new()));
                    config.counter = endpoint;
                }
            }
        }
        state_for(config)
    }

    fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).expect("request")
    }

    async fn body_json(response: Response) -> Value {
        let bytes = hyper::body::to_bytes(response.into_body()).await.expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[test]
    fn session_cookie_is_found_among_others() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            format!("theme=dark; {SESSION_COOKIE}={id}").parse().expect("header"),
        );
        assert_eq!(session_cookie(&headers), Some(id));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "reeltrack_session=garbage".parse().expect("header"));
        assert_eq!(session_cookie(&headers), None);
    }

    #[tokio::test]
    async fn catalog_without_session_redirects_to_login() {
        let app = router(state_for(HubConfig::default()));
        let response = app
            .oneshot(Request::builder().uri("/items").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], LOGIN_PATH);
    }

    #[tokio::test]
    async fn unknown_session_cookie_redirects_to_login() {
        let app = router(state_for(HubConfig::default()));
        let cookie = format!("{SESSION_COOKIE}={}", Uuid::new_v4());
        let response = app
            .oneshot(json_request("DELETE", "/items/1", Some(&cookie), json!({})))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn mismatched_registration_is_refused_locally() {
        // no services are running; a remote call would fail with 503
        let app = router(state_for(HubConfig::default()));
        let response = app
            .oneshot(json_request(
                "POST",
                "/register",
                None,
                json!({"username": "bob", "password": "a", "confirm_password": "b"}),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "Passwords do not match");
    }

    #[tokio::test]
    async fn login_add_remove_round_trip() {
        let state = live_state().await;

        let rejected = router(state.clone())
            .oneshot(json_request(
                "POST",
                "/login",
                None,
                json!({"username": "alice", "password": "wrong"}),
            ))
            .await
            .expect("response");
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(rejected).await["redirect"], LOGIN_PATH);

        let login = router(state.clone())
            .oneshot(json_request(
                "POST",
                "/login",
                None,
                json!({"username": "alice", "password": "secret", "time_format": "12"}),
            ))
            .await
            .expect("response");
        assert_eq!(login.status(), StatusCode::OK);
        let set_cookie = login.headers()[header::SET_COOKIE].to_str().expect("cookie").to_string();
        let cookie = set_cookie.split(';').next().expect("pair").to_string();

        for title in ["Alien", "Aliens", "Alien 3"] {
            let added = router(state.clone())
                .oneshot(json_request("POST", "/items", Some(&cookie), json!({"title": title})))
                .await
                .expect("response");
            assert_eq!(added.status(), StatusCode::CREATED);
            assert_eq!(body_json(added).await["counter"]["state"], "synced");
        }

        let removed = router(state.clone())
            .oneshot(json_request("DELETE", "/items/2", Some(&cookie), json!({})))
            .await
            .expect("response");
        assert_eq!(removed.status(), StatusCode::OK);
        let body = body_json(removed).await;
        assert_eq!(body["counter"], json!({"state": "synced", "count": 2}));

        let missing = router(state.clone())
            .oneshot(json_request("DELETE", "/items/2", Some(&cookie), json!({})))
            .await
            .expect("response");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(missing).await["counter"]["state"], "skipped");

        let status = router(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/counter")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let body = body_json(status).await;
        assert_eq!(body["count"], 2);
        assert_eq!(body["in_sync"], true);

        let logout = router(state.clone())
            .oneshot(json_request("POST", "/logout", Some(&cookie), json!({})))
            .await
            .expect("response");
        assert_eq!(logout.status(), StatusCode::OK);
        assert_eq!(state.sessions.active_sessions(), 0);
    }
}
