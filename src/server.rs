//! Web server for browsing, creating and editing rules summaries.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Summary list, filtered by `?q=` |
//! | `GET`  | `/upload` | Upload form |
//! | `POST` | `/upload` | Multipart upload (`rulebook`, `bgg_link`, `password`) |
//! | `GET`  | `/summary/{id}` | Rendered summary, searchable via `?q=&m=&last=` |
//! | `GET`  | `/summary/{id}/raw` | Markdown download |
//! | `GET`  | `/summary/{id}/edit` | Edit form (creator only) |
//! | `POST` | `/summary/{id}/edit` | Save edits (creator only) |
//! | `POST` | `/summary/{id}/delete` | Delete (creator only) |
//! | `POST` | `/theme` | Toggle the light/dark theme cookie |
//! | `GET`  | `/api/duplicates` | Records matching `?filename=` or `?link=` |
//! | `GET`  | `/api/summaries/{id}/search` | Highlighted body and match counter |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Errors
//!
//! Page routes answer with an HTML error page: 400 for bad input, 401 for a
//! wrong upload password, 403 for edits by anyone but the creator, 404 for
//! unknown ids (a dedicated not-found page) and 500 for upstream failures,
//! whose detail is logged rather than shown. API routes answer with
//!
//! ```json
//! { "error": { "code": "not_found", "message": "summary not found" } }
//! ```
//!
//! # Identity
//!
//! With `[server] trust_identity_headers` set, the signed-in user is read
//! from `x-auth-uid`, `x-auth-name`, `x-auth-email` and
//! `x-auth-email-verified`, as set by a fronting identity proxy. Identities
//! whose email is not verified are treated as signed out.

use axum::{
    extract::{DefaultBodyLimit, FromRequestParts, Multipart, Path, Query, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use rulesheet_core::auth::{can_edit, Identity};
use rulesheet_core::duplicates;
use rulesheet_core::models::{SummaryPatch, SummaryRecord};
use rulesheet_core::session::{Session, Theme, THEME_COOKIE};
use rulesheet_core::store::SummaryStore;

use crate::access::AccessGate;
use crate::config::Config;
use crate::db;
use crate::extract::{PdfExtractor, TextExtractor};
use crate::generate::{Generator, OpenAiGenerator};
use crate::migrate;
use crate::pages;
use crate::render::{is_web_link, markdown_to_html, percent_encode};
use crate::search::{search_summary, SearchOutcome, SearchQuery};
use crate::sqlite_store::SqliteStore;
use crate::upload::{
    Summarizer, UploadFile, UploadLimits, UploadRequest, INVALID_LINK_MESSAGE,
};

/// Room for the non-file form fields and multipart framing.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn SummaryStore>,
    pub summarizer: Summarizer,
    pub gate: AccessGate,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn SummaryStore>,
        extractor: Arc<dyn TextExtractor>,
        generator: Arc<dyn Generator>,
    ) -> anyhow::Result<Self> {
        let gate = AccessGate::from_config(&config.access)?;
        let summarizer = Summarizer {
            store: store.clone(),
            extractor,
            generator,
            limits: UploadLimits::from_config(&config),
        };
        Ok(Self {
            config: Arc::new(config),
            store,
            summarizer,
            gate,
        })
    }
}

/// Starts the HTTP server.
///
/// Opens (and migrates) the configured database, builds the PDF extractor
/// and the OpenAI generator, and serves on `[server].bind` until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::migrate_pool(&pool).await?;

    let generator = OpenAiGenerator::new(&config.generation)?;
    let state = AppState::new(
        config.clone(),
        Arc::new(SqliteStore::new(pool)),
        Arc::new(PdfExtractor),
        Arc::new(generator),
    )?;

    if state.gate.is_gated() {
        tracing::info!("uploads require a password");
    }

    let bind_addr = config.server.bind.clone();
    let app = build_router(state);

    tracing::info!(model = %config.generation.model, "listening on http://{}", bind_addr);
    println!("Rulesheet listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// All routes with their layers.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = state
        .config
        .server
        .max_upload_bytes()
        .saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(handle_home))
        .route("/upload", get(handle_upload_form).post(handle_upload))
        .route("/summary/{id}", get(handle_summary))
        .route("/summary/{id}/raw", get(handle_raw))
        .route("/summary/{id}/edit", get(handle_edit_form).post(handle_edit))
        .route("/summary/{id}/delete", post(handle_delete))
        .route("/theme", post(handle_theme))
        .route("/api/duplicates", get(handle_duplicates))
        .route("/api/summaries/{id}/search", get(handle_search))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============ Session ============

/// The request's [`Session`]: theme cookie plus proxy-supplied identity.
pub struct CurrentSession(pub Session);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(CurrentSession(session_from_headers(
            &parts.headers,
            state.config.server.trust_identity_headers,
        )))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Build a [`Session`] from request headers.
pub fn session_from_headers(headers: &HeaderMap, trust_identity: bool) -> Session {
    let theme = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(Theme::from_cookie_header)
        .find(|t| t.is_dark())
        .unwrap_or_default();

    let identity = if trust_identity {
        header_str(headers, "x-auth-uid").map(|uid| Identity {
            uid: uid.to_string(),
            display_name: header_str(headers, "x-auth-name").map(str::to_string),
            email: header_str(headers, "x-auth-email").map(str::to_string),
            email_verified: header_str(headers, "x-auth-email-verified")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    } else {
        None
    };

    Session {
        identity: identity.filter(|i| i.email_verified),
        theme,
    }
}

// ============ Error responses ============

/// HTML error page response.
struct PageError {
    status: StatusCode,
    session: Session,
    message: Option<String>,
}

impl PageError {
    fn new(status: StatusCode, session: &Session, message: impl Into<String>) -> Self {
        Self {
            status,
            session: session.clone(),
            message: Some(message.into()),
        }
    }

    fn not_found(session: &Session) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            session: session.clone(),
            message: None,
        }
    }

    fn forbidden(session: &Session) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            session,
            "You do not have permission to change this summary.",
        )
    }

    /// Logs `err` and hides it behind a generic message.
    fn internal(session: &Session, err: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{:#}", err), "request failed");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            session,
            "An unexpected error occurred.",
        )
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let body = match self.message {
            Some(message) => pages::error(&self.session, &message),
            None => pages::not_found(&self.session),
        };
        (self.status, Html(body)).into_response()
    }
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// API error that converts into a JSON response.
struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn internal_error(err: anyhow::Error) -> ApiError {
    tracing::error!(error = %format!("{:#}", err), "api request failed");
    ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: "internal error".to_string(),
    }
}

async fn load_record(
    state: &AppState,
    session: &Session,
    id: &str,
) -> Result<SummaryRecord, PageError> {
    state
        .store
        .get(id)
        .await
        .map_err(|e| PageError::internal(session, e))?
        .ok_or_else(|| PageError::not_found(session))
}

/// Load a record the session's identity is allowed to change.
async fn load_editable(
    state: &AppState,
    session: &Session,
    id: &str,
) -> Result<SummaryRecord, PageError> {
    let record = load_record(state, session, id).await?;
    if !can_edit(&record, session.identity.as_ref()) {
        return Err(PageError::forbidden(session));
    }
    Ok(record)
}

// ============ GET / ============

#[derive(Deserialize)]
struct HomeQuery {
    #[serde(default)]
    q: String,
}

async fn handle_home(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<HomeQuery>,
) -> Result<Html<String>, PageError> {
    let records = state
        .store
        .list()
        .await
        .map_err(|e| PageError::internal(&session, e))?;
    Ok(Html(pages::home(&session, &records, &query.q, Utc::now())))
}

// ============ GET/POST /upload ============

async fn handle_upload_form(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Html<String> {
    Html(pages::upload(
        &session,
        &pages::UploadForm {
            password_required: state.gate.is_gated(),
            ..Default::default()
        },
    ))
}

#[derive(Default)]
struct UploadFields {
    files: Vec<UploadFile>,
    bgg_link: Option<String>,
    password: Option<String>,
}

async fn read_upload_fields(
    multipart: &mut Multipart,
    max_upload_mb: u64,
) -> Result<UploadFields, String> {
    let read_error = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            format!("File too large. Maximum size is {}MB.", max_upload_mb)
        } else {
            format!("Could not read the upload: {}", e.body_text())
        }
    };

    let mut fields = UploadFields::default();
    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("rulebook") => {
                let filename = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(read_error)?;
                // Browsers send one empty part when no file was chosen.
                if filename.is_empty() && bytes.is_empty() {
                    continue;
                }
                fields.files.push(UploadFile {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("bgg_link") => fields.bgg_link = Some(field.text().await.map_err(read_error)?),
            Some("password") => fields.password = Some(field.text().await.map_err(read_error)?),
            _ => {}
        }
    }
    Ok(fields)
}

async fn handle_upload(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    mut multipart: Multipart,
) -> Response {
    let redraw = |status: StatusCode, error: &str, bgg_link: &str| {
        let page = pages::upload(
            &session,
            &pages::UploadForm {
                password_required: state.gate.is_gated(),
                error: Some(error),
                bgg_link,
            },
        );
        (status, Html(page)).into_response()
    };

    let fields = match read_upload_fields(&mut multipart, state.config.server.max_upload_mb).await {
        Ok(fields) => fields,
        Err(message) => return redraw(StatusCode::BAD_REQUEST, &message, ""),
    };
    let bgg_link = fields.bgg_link.clone().unwrap_or_default();

    if !state.gate.allows(fields.password.as_deref()) {
        tracing::warn!("upload rejected: wrong password");
        return redraw(StatusCode::UNAUTHORIZED, "Incorrect password.", &bgg_link);
    }

    tracing::info!(files = fields.files.len(), "upload received");
    let request = UploadRequest {
        files: fields.files,
        bgg_link: fields.bgg_link,
        identity: session.identity.clone(),
    };

    match state.summarizer.create_summary(request).await {
        Ok(id) => Redirect::to(&format!("/summary/{}", id)).into_response(),
        Err(e) if e.is_validation() => {
            tracing::warn!(error = %e, "upload rejected");
            redraw(StatusCode::BAD_REQUEST, &e.user_message(), &bgg_link)
        }
        Err(e) => {
            tracing::error!(error = %e, "upload failed");
            PageError::new(StatusCode::INTERNAL_SERVER_ERROR, &session, e.user_message())
                .into_response()
        }
    }
}

// ============ GET /summary/{id} ============

async fn handle_summary(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Html<String>, PageError> {
    let record = load_record(&state, &session, &id).await?;
    let search = search_summary(&markdown_to_html(&record.markdown), &query);
    let editable = can_edit(&record, session.identity.as_ref());
    Ok(Html(pages::summary(&session, &record, &search, editable)))
}

// ============ GET /summary/{id}/raw ============

/// `Content-Disposition` for the markdown download, with an ASCII fallback
/// name and the exact name in RFC 5987 form.
fn attachment_header(filename: &str) -> Option<HeaderValue> {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        percent_encode(filename)
    ))
    .ok()
}

async fn handle_raw(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let record = match state.store.get(&id).await {
        Ok(Some(record)) => record,
        Ok(None) => return (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(e) => return internal_error(e).into_response(),
    };

    let mut response = (
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        record.markdown.clone(),
    )
        .into_response();
    if let Some(value) = attachment_header(&record.download_name()) {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

// ============ Edit and delete ============

async fn handle_edit_form(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> Result<Html<String>, PageError> {
    let record = load_editable(&state, &session, &id).await?;
    Ok(Html(pages::edit(&session, &record, None)))
}

#[derive(Deserialize)]
struct EditForm {
    game_title: String,
    markdown: String,
    #[serde(default)]
    bgg_link: String,
}

async fn handle_edit(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
    Form(form): Form<EditForm>,
) -> Result<Response, PageError> {
    let mut record = load_editable(&state, &session, &id).await?;

    let title = form.game_title.trim();
    let link = form.bgg_link.trim();
    let patch = SummaryPatch {
        game_title: Some(title.to_string()),
        markdown: Some(form.markdown.clone()),
        bgg_link: Some((!link.is_empty()).then(|| link.to_string())),
    };

    let invalid = if title.is_empty() || form.markdown.trim().is_empty() {
        Some("Title and summary must not be empty.")
    } else if !link.is_empty() && !is_web_link(link) {
        Some(INVALID_LINK_MESSAGE)
    } else {
        None
    };
    if let Some(message) = invalid {
        patch.apply(&mut record);
        let page = pages::edit(&session, &record, Some(message));
        return Ok((StatusCode::BAD_REQUEST, Html(page)).into_response());
    }

    let updated = state
        .store
        .update(&id, &patch)
        .await
        .map_err(|e| PageError::internal(&session, e))?;
    if !updated {
        return Err(PageError::not_found(&session));
    }

    tracing::info!(id = %id, "summary edited");
    Ok(Redirect::to(&format!("/summary/{}", id)).into_response())
}

async fn handle_delete(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> Result<Redirect, PageError> {
    load_editable(&state, &session, &id).await?;
    state
        .store
        .delete(&id)
        .await
        .map_err(|e| PageError::internal(&session, e))?;
    tracing::info!(id = %id, "summary deleted");
    Ok(Redirect::to("/"))
}

// ============ POST /theme ============

/// Path part of a `Referer` header, used to return to the page the toggle
/// was clicked on.
fn referer_path(headers: &HeaderMap) -> String {
    header_str(headers, "referer")
        .and_then(|r| {
            let after_scheme = r.split_once("://").map(|(_, rest)| rest)?;
            let path = &after_scheme[after_scheme.find('/')?..];
            (!path.starts_with("//")).then(|| path.to_string())
        })
        .unwrap_or_else(|| "/".to_string())
}

async fn handle_theme(CurrentSession(session): CurrentSession, headers: HeaderMap) -> Response {
    let theme = session.theme.toggled();
    let cookie = format!(
        "{}={}; Path=/; Max-Age=31536000; SameSite=Lax",
        THEME_COOKIE, theme
    );
    (
        [(header::SET_COOKIE, cookie)],
        Redirect::to(&referer_path(&headers)),
    )
        .into_response()
}

// ============ GET /api/duplicates ============

/// The fields of a matching record the upload page needs to warn about it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DuplicateMatch {
    id: String,
    game_title: String,
    original_filename: String,
    created_at: DateTime<Utc>,
}

impl From<SummaryRecord> for DuplicateMatch {
    fn from(record: SummaryRecord) -> Self {
        Self {
            id: record.id,
            game_title: record.game_title,
            original_filename: record.original_filename,
            created_at: record.created_at,
        }
    }
}

#[derive(Deserialize)]
struct DuplicateQuery {
    filename: Option<String>,
    link: Option<String>,
}

async fn handle_duplicates(
    State(state): State<AppState>,
    Query(query): Query<DuplicateQuery>,
) -> Result<Json<Vec<DuplicateMatch>>, ApiError> {
    let found = match (query.filename.as_deref(), query.link.as_deref()) {
        (Some(filename), _) => duplicates::find_by_filename(state.store.as_ref(), filename).await,
        (None, Some(link)) => duplicates::find_by_external_link(state.store.as_ref(), link).await,
        (None, None) => return Err(bad_request("filename or link is required")),
    }
    .map_err(internal_error)?;
    Ok(Json(found.into_iter().map(DuplicateMatch::from).collect()))
}

// ============ GET /api/summaries/{id}/search ============

async fn handle_search(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchOutcome>, ApiError> {
    let record = state
        .store
        .get(&id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found("summary not found"))?;
    Ok(Json(search_summary(&markdown_to_html(&record.markdown), &query)))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
