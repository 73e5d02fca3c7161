use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{header, HeaderMap, HeaderValue, Method as HttpMethod, StatusCode},
    response::{Html, IntoResponse, Response as HttpResponse},
    routing::get,
    Router,
};
use dispatch::{Ctx, Init, Method, Request, Response, Session, SiteInfo};
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use url::form_urlencoded;
use uuid::Uuid;

mod config;

use config::{load_settings, Settings};

const SESSION_COOKIE: &str = "sid";
const MAX_FORM_BYTES: usize = 64 * 1024;

#[derive(Clone)]
struct AppState {
    init: Arc<Init>,
    storage: Storage,
}

impl AppState {
    fn new(settings: &Settings, storage: Storage) -> anyhow::Result<Self> {
        let site = SiteInfo {
            name: settings.site_name.clone(),
            mail_from: settings.mail_from.clone(),
        };
        let registry = site::registry(site)
            .default_object(&settings.default_object)
            .default_theme(&settings.default_theme);
        Ok(Self {
            init: Arc::new(Init::new(registry)?),
            storage,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = load_settings();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let database_url = settings.database_url.clone();
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let purged = storage.purge_sessions(settings.session_ttl_seconds).await?;
    info!(purged, "expired sessions removed");

    let state = AppState::new(&settings, storage)?;
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, site = %settings.site_name, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(page).post(page))
        .route("/healthz", get(healthz))
        .layer(RequestBodyLimitLayer::new(MAX_FORM_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match state.storage.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(error) => {
            error!(%error, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}

/// Every page goes through here: load the session, dispatch, persist the
/// session if it changed, then translate the outcome to HTTP.
async fn page(
    State(state): State<Arc<AppState>>,
    method: HttpMethod,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> HttpResponse {
    let request = parse_request(&method, query.as_deref(), &body);
    let session = load_session(&state.storage, &headers).await;

    let mut ctx = Ctx::new(request, session).with_db(state.storage.db());
    let response = state.init.dispatch(&mut ctx).await;
    let session = ctx.into_session();

    let mut http = into_http(response);
    if session.is_dirty() {
        match state.storage.save_session(session.id(), session.data()).await {
            Ok(()) if session.is_fresh() => {
                let cookie = format!(
                    "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
                    session.id()
                );
                if let Ok(value) = HeaderValue::from_str(&cookie) {
                    http.headers_mut().append(header::SET_COOKIE, value);
                }
            }
            Ok(()) => {}
            Err(error) => error!(%error, session_id = session.id(), "failed to save session"),
        }
    }
    http
}

/// Query-string fields, overlaid by form fields on POST.
fn parse_request(method: &HttpMethod, query: Option<&str>, body: &[u8]) -> Request {
    let mut params: HashMap<String, String> = query
        .map(|query| form_urlencoded::parse(query.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let method = if method == HttpMethod::POST {
        params.extend(form_urlencoded::parse(body).into_owned());
        Method::Post
    } else {
        Method::Get
    };
    Request { method, params }
}

fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| Uuid::parse_str(value).is_ok())
}

async fn load_session(storage: &Storage, headers: &HeaderMap) -> Session {
    let Some(id) = session_cookie(headers) else {
        return Session::new();
    };
    match storage.load_session(id).await {
        Ok(Some(data)) => Session::restore(id, data),
        Ok(None) => Session::new(),
        Err(error) => {
            warn!(%error, session_id = id, "discarding unreadable session");
            Session::new()
        }
    }
}

fn into_http(response: Response) -> HttpResponse {
    match response {
        Response::Page { status, body } => {
            let status =
                StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Html(body)).into_response()
        }
        Response::Redirect { location } => {
            (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response()
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
