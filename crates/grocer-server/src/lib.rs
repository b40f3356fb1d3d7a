//! Grocer Web Server
//!
//! Axum-based REST API for the Grocer grocery budget tracker.
//!
//! Security features:
//! - Cloudflare Access authentication (secure by default, use --no-auth for local dev)
//! - Per-user API keys for scripts and other services
//! - Restrictive CORS policy
//! - Audit logging for every write, export and tip interaction
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use grocer_core::{AuditAction, Database, TipCatalog};

mod handlers;

/// Maximum JSON body size for single-record writes (64 KB)
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Maximum JSON body size for batch item creation (1 MB)
pub const MAX_BATCH_BODY_SIZE: usize = 1024 * 1024;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// User id used when authentication is disabled
pub const LOCAL_DEV_USER: &str = "local-dev";

/// Cloudflare Access header for authenticated user email
const CF_ACCESS_USER_HEADER: &str = "cf-access-authenticated-user-email";

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// An API key and the user it acts as
#[derive(Clone)]
pub struct ApiKey {
    pub user: String,
    pub key: String,
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("user", &self.user)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Parse a comma-separated list of `user:key` pairs
///
/// Entries without a user or key are skipped with a warning.
pub fn parse_api_keys(input: &str) -> Vec<ApiKey> {
    input
        .split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            if entry.is_empty() {
                return None;
            }
            match entry.split_once(':') {
                Some((user, key)) if !user.trim().is_empty() && !key.trim().is_empty() => {
                    Some(ApiKey {
                        user: user.trim().to_string(),
                        key: key.trim().to_string(),
                    })
                }
                _ => {
                    warn!("Skipping malformed API key entry (expected user:key)");
                    None
                }
            }
        })
        .collect()
}

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only in production)
    pub allowed_origins: Vec<String>,
    /// API keys, each bound to a user.
    /// Format: "Bearer <key>" in Authorization header
    pub api_keys: Vec<ApiKey>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    /// Read-only tip content, loaded once at startup
    pub tips: TipCatalog,
}

impl AppState {
    /// Calendar date used for default purchase dates, expiry and seasons
    pub(crate) fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    /// Record a completed action. The action already happened, so a failed
    /// audit insert is logged and the response goes out unchanged.
    pub(crate) fn audit(
        &self,
        user_id: &str,
        action: AuditAction,
        entity_type: &str,
        entity_id: Option<i64>,
        details: Option<&str>,
    ) {
        if let Err(e) = self
            .db
            .log_audit(user_id, action, Some(entity_type), entity_id, details)
        {
            warn!(error = %e, action = %action, "Failed to record audit entry");
        }
    }

    /// Record a failed write. Never fails the request.
    pub(crate) fn audit_failure(
        &self,
        user_id: &str,
        action: AuditAction,
        entity_type: &str,
        entity_id: Option<i64>,
        err: &grocer_core::Error,
    ) {
        if let Err(e) = self.db.log_audit_failure(
            user_id,
            action,
            Some(entity_type),
            entity_id,
            Some(&err.to_string()),
        ) {
            warn!(error = %e, action = %action, "Failed to record audit failure");
        }
    }
}

/// The user a request acts as, resolved by [`auth_middleware`]
#[derive(Clone, Debug)]
pub struct AuthUser(pub String);

/// Authentication middleware - resolves the user from Cloudflare Access or an API key
///
/// # Security Notes
///
/// **Cloudflare Access headers**: The `CF-Access-Authenticated-User-Email` header is
/// safe behind Cloudflare Tunnel (which strips/rewrites CF headers), but can be
/// spoofed if the server is exposed directly to the internet.
///
/// **API keys**: Compared using constant-time comparison to prevent timing attacks.
/// Each key acts as the user it is bound to.
///
/// With auth disabled, the CF header is still honored when present so a
/// local server can be driven as different users; otherwise requests act
/// as `local-dev`.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let cf_user = request
        .headers()
        .get(CF_ACCESS_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    if !state.config.require_auth {
        let user = cf_user.unwrap_or_else(|| LOCAL_DEV_USER.to_string());
        request.extensions_mut().insert(AuthUser(user));
        return next.run(request).await;
    }

    if let Some(email) = cf_user {
        info!(user = %email, path = %request.uri().path(), "Authenticated via Cloudflare Access header");
        request.extensions_mut().insert(AuthUser(email));
        return next.run(request).await;
    }

    let api_key_user = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .and_then(|key| validate_api_key(key.trim(), &state.config.api_keys));

    if let Some(user) = api_key_user {
        info!(user = %user, path = %request.uri().path(), "Authenticated via API key");
        request.extensions_mut().insert(AuthUser(user));
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Find the user bound to an API key using constant-time comparison
/// to prevent timing attacks.
fn validate_api_key(provided: &str, valid_keys: &[ApiKey]) -> Option<String> {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();
    let mut matched = None;

    for api_key in valid_keys {
        let key_bytes = api_key.key.as_bytes();
        // Only compare if lengths match (constant-time for same-length keys)
        if provided_bytes.len() == key_bytes.len()
            && bool::from(provided_bytes.ct_eq(key_bytes))
            && matched.is_none()
        {
            matched = Some(api_key.user.clone());
        }
    }
    matched
}

/// The user a request acts as
///
/// Every `/api` route runs behind [`auth_middleware`], which always sets
/// [`AuthUser`]; the fallback only matters for handlers mounted elsewhere.
pub fn current_user(request: &Request) -> String {
    request
        .extensions()
        .get::<AuthUser>()
        .map(|u| u.0.clone())
        .unwrap_or_else(|| LOCAL_DEV_USER.to_string())
}

/// Read and parse a JSON request body of at most `limit` bytes
pub(crate) async fn read_json<T: DeserializeOwned>(
    request: Request,
    limit: usize,
) -> Result<T, AppError> {
    let bytes = axum::body::to_bytes(request.into_body(), limit)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    serde_json::from_slice(&bytes).map_err(|e| {
        AppError::bad_request("Invalid JSON").with_details(serde_json::json!({
            "reason": e.to_string()
        }))
    })
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// GET /api/health - Liveness check, no auth
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Create the application router
///
/// Loads the tip catalog from the data-dir override, falling back to
/// the embedded catalog if the override cannot be read.
pub fn create_router(db: Database, static_dir: Option<&str>, config: ServerConfig) -> Router {
    let tips = TipCatalog::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load tip catalog override, using embedded catalog");
        TipCatalog::embedded().unwrap_or_else(|e| {
            error!(error = %e, "Embedded tip catalog is invalid, serving no tips");
            TipCatalog::default()
        })
    });
    create_router_with_catalog(db, static_dir, config, tips)
}

/// Create the application router with an explicit tip catalog (for testing)
pub fn create_router_with_catalog(
    db: Database,
    static_dir: Option<&str>,
    config: ServerConfig,
    tips: TipCatalog,
) -> Router {
    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        tips,
    });

    let api_routes = Router::new()
        // Budgets
        .route(
            "/budgets",
            get(handlers::list_budgets).post(handlers::create_budget),
        )
        .route("/budgets/active", get(handlers::get_active_budget))
        .route(
            "/budgets/:id",
            get(handlers::get_budget)
                .put(handlers::update_budget)
                .delete(handlers::delete_budget),
        )
        .route(
            "/budgets/:id/allocations",
            put(handlers::update_allocations),
        )
        .route("/budgets/:id/totals", get(handlers::get_budget_totals))
        // Items
        .route("/items", get(handlers::list_items).post(handlers::create_item))
        .route("/items/batch", post(handlers::batch_create_items))
        .route(
            "/items/:id",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        )
        // Categories
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/categories/:id",
            put(handlers::update_category).delete(handlers::delete_category),
        )
        // Tips
        .route("/tips", get(handlers::list_tips))
        .route("/tips/generate/:budget_id", get(handlers::generate_tips))
        .route("/tips/threshold/:budget_id", get(handlers::get_threshold_tips))
        .route("/tips/seasonal", get(handlers::get_seasonal_tips))
        .route("/tips/analyze/:budget_id", get(handlers::analyze_spending))
        .route("/tips/:id/helpful", post(handlers::mark_tip_helpful))
        // Exports
        .route("/exports/budget/:id", get(handlers::export_budget_summary))
        .route("/exports/budget/:id/pdf", get(handlers::export_budget_pdf))
        .route("/exports/items/:id", get(handlers::export_items))
        .route(
            "/exports/categories/:id",
            get(handlers::export_category_breakdown),
        )
        .route("/exports/report", get(handlers::export_report))
        // History
        .route("/history/activity", get(handlers::list_activity))
        .route("/history/activity/summary", get(handlers::get_activity_summary))
        .route("/history/budget/:id/audit", get(handlers::get_budget_audit_trail))
        .route("/history/budget/:id/compare", get(handlers::compare_budget_periods))
        .route("/history/trends", get(handlers::get_spending_trends))
        .route("/history/audit/clean", post(handlers::clean_audit_log))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .route("/health", get(health));

    // Build CORS layer
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    // CSP: same-origin scripts, inline styles for the dashboard
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; connect-src 'self'; frame-ancestors 'none'",
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    serve_with_config(db, host, port, static_dir, ServerConfig::default()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    } else if config.api_keys.is_empty() {
        info!("No API keys configured; only Cloudflare Access users can authenticate");
    }

    let tips = TipCatalog::load()?;

    // Make sure the stored tips exist even if `grocer init` was never run
    match db.seed_tips(tips.stored_tips()) {
        Ok(count) if count > 0 => info!("Seeded {} stored tip(s)", count),
        Ok(_) => {}
        Err(e) => warn!("Failed to seed stored tips: {}", e),
    }

    let app = create_router_with_catalog(db, static_dir, config, tips);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    /// Structured context for rejected writes (limits, overage, counts)
    details: Option<serde_json::Value>,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn new(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            details: None,
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn conflict(msg: &str) -> Self {
        Self::new(StatusCode::CONFLICT, msg)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Map a core error to its HTTP form
    ///
    /// Rejections keep their message and carry structured details.
    /// Anything else becomes a generic 500 with the error kept for logging.
    fn from_core(err: &grocer_core::Error) -> Option<Self> {
        use grocer_core::Error as CoreError;
        use serde_json::json;

        let message = err.to_string();
        let mapped = match err {
            CoreError::NotFound(_) => Self::not_found(&message),
            CoreError::Validation(msg) => Self::bad_request(msg),
            CoreError::InactiveBudget => Self::bad_request(&message)
                .with_details(json!({ "code": "inactive_budget" })),
            CoreError::TotalLimitExceeded {
                current_spent,
                total_limit,
                delta,
                overage,
            } => Self::bad_request(&message).with_details(json!({
                "code": "total_limit_exceeded",
                "current_spent": current_spent,
                "total_limit": total_limit,
                "delta": delta,
                "overage": overage,
            })),
            CoreError::CategoryLimitExceeded {
                category_id,
                category_spent,
                category_limit,
                delta,
                overage,
            } => Self::bad_request(&message).with_details(json!({
                "code": "category_limit_exceeded",
                "category_id": category_id,
                "category_spent": category_spent,
                "category_limit": category_limit,
                "delta": delta,
                "overage": overage,
            })),
            CoreError::InvalidAllocation {
                allocated,
                total_limit,
            } => Self::bad_request(&message).with_details(json!({
                "code": "invalid_allocation",
                "allocated": allocated,
                "total_limit": total_limit,
            })),
            CoreError::BudgetNotEmpty { item_count } => Self::conflict(&message)
                .with_details(json!({
                    "code": "budget_not_empty",
                    "item_count": item_count,
                })),
            _ => return None,
        };
        Some(mapped)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = match self.details {
            Some(details) => Json(serde_json::json!({
                "error": self.message,
                "details": details,
            })),
            None => Json(serde_json::json!({
                "error": self.message
            })),
        };

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        if let Some(mapped) = err
            .downcast_ref::<grocer_core::Error>()
            .and_then(AppError::from_core)
        {
            return mapped;
        }
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            details: None,
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
