//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: matches method and path to one of
//! the four exchange operations, validates input, and maps the outcome to a
//! status code and plaintext body.

use crate::config::{AppState, RoutesConfig};
use crate::exchange::{ExchangeError, UploadOutcome};
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{CONTENT_LENGTH, USER_AGENT};
use hyper::{HeaderMap, Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Operation selected for a request
#[derive(Debug, PartialEq, Eq)]
pub enum Route<'a> {
    /// Bare served-root path: reachability probe
    Liveness,
    /// File under a served root; holds the path relative to the base directory
    Serve(&'a str),
    Move,
    Upload,
    NotFound,
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let access_log = state.config.logging.access_log;

    let mut entry = access_log.then(|| {
        let mut entry = AccessLogEntry::new(
            remote_addr.ip().to_string(),
            req.method().to_string(),
            req.uri().path().to_string(),
        );
        entry.query = req.uri().query().map(ToString::to_string);
        entry.http_version = format_version(req.version()).to_string();
        entry.user_agent = req
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        entry
    });

    let response = match dispatch(req, &state).await {
        Ok(resp) => resp,
        Err(err) => http::build_error_response(&err),
    };

    if let Some(entry) = entry.as_mut() {
        entry.status = response.status().as_u16();
        entry.body_bytes = usize::try_from(response.body().size_hint().exact().unwrap_or(0))
            .unwrap_or(usize::MAX);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Run the matched operation
async fn dispatch<B>(req: Request<B>, state: &AppState) -> Result<Response<Full<Bytes>>, ExchangeError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let path = req.uri().path().to_string();
    let file_param = query_param(req.uri().query(), "file");

    match match_route(req.method(), &path, &state.config.routes) {
        Route::Liveness => Ok(http::build_text_response(200, "ok")),
        Route::Serve(relative) => {
            let file = state.store.read_served(relative).await?;
            Ok(http::build_file_response(file.data, file.content_type))
        }
        Route::Move => {
            state.store.move_to_done(&file_param).await?;
            Ok(http::build_text_response(200, "ok"))
        }
        Route::Upload => {
            // Name and allow-list checks come before the body is read
            state.store.check_upload_name(&file_param)?;
            let declared =
                declared_content_length(req.headers(), state.config.storage.max_upload_bytes)?;
            let body = read_body(req.into_body(), declared).await?;

            let outcome = state.store.upload(&file_param, &body).await?;
            let message = match outcome {
                UploadOutcome::Unchanged => "unchanged",
                UploadOutcome::Created | UploadOutcome::Replaced { .. } => "saved",
            };
            Ok(http::build_text_response(200, message))
        }
        Route::NotFound => Err(ExchangeError::NotFound),
    }
}

/// Match method and path against the configured endpoints
pub fn match_route<'a>(method: &Method, path: &'a str, routes: &RoutesConfig) -> Route<'a> {
    match *method {
        Method::POST if path == routes.upload_path => Route::Upload,
        Method::GET if path.starts_with(routes.move_path.as_str()) => Route::Move,
        Method::GET => routes
            .served_roots
            .iter()
            .find_map(|root| match_served_root(path, root))
            .unwrap_or(Route::NotFound),
        _ => Route::NotFound,
    }
}

/// `/csv` and `/csv/` are the liveness probe, `/csv/<rest>` serves `<rest>`
fn match_served_root<'a>(path: &'a str, root: &str) -> Option<Route<'a>> {
    let root = root.trim_end_matches('/');
    let rest = path.strip_prefix(root)?;
    match rest {
        "" | "/" => Some(Route::Liveness),
        _ => rest.strip_prefix('/').map(Route::Serve),
    }
}

/// First value of `key` in a query string, percent-decoded (`+` is a space).
/// Missing or undecodable values yield an empty string.
pub fn query_param(query: Option<&str>, key: &str) -> String {
    query
        .into_iter()
        .flat_map(|q| q.split('&'))
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(k, _)| decode_component(k) == key)
        .map(|(_, v)| decode_component(v))
        .unwrap_or_default()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default()
}

/// Declared body length; a missing header counts as 0.
/// Lengths of 0, above `max`, or unparsable are rejected.
fn declared_content_length(headers: &HeaderMap, max: u64) -> Result<usize, ExchangeError> {
    const BAD_LENGTH: ExchangeError = ExchangeError::InvalidInput("bad content length");

    let declared = match headers.get(CONTENT_LENGTH) {
        None => 0,
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .ok_or(BAD_LENGTH)?,
    };
    if declared == 0 || declared > max {
        return Err(BAD_LENGTH);
    }
    usize::try_from(declared).map_err(|_| BAD_LENGTH)
}

/// Read exactly `declared` bytes of the request body
async fn read_body<B>(body: B, declared: usize) -> Result<Bytes, ExchangeError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let collected = Limited::new(body, declared).collect().await.map_err(|e| {
        logger::log_warning(&format!("Failed to read upload body: {e}"));
        ExchangeError::InvalidInput("bad content length")
    })?;
    let bytes = collected.to_bytes();
    if bytes.len() != declared {
        logger::log_warning(&format!(
            "Upload body shorter than declared: {} of {declared} bytes",
            bytes.len()
        ));
        return Err(ExchangeError::InvalidInput("bad content length"));
    }
    Ok(bytes)
}

fn format_version(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    fn routes() -> RoutesConfig {
        Config::with_base_dir("/tmp").routes
    }

    fn setup() -> (TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(AppState::new(&Config::with_base_dir(dir.path())));
        (dir, state)
    }

    fn addr() -> SocketAddr {
        "192.168.1.40:50000".parse().unwrap()
    }

    async fn send(state: &Arc<AppState>, req: Request<Full<Bytes>>) -> (u16, Option<String>, Bytes) {
        let resp = handle_request(req, Arc::clone(state), addr()).await.unwrap();
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get("content-type")
            .map(|v| v.to_str().unwrap().to_string());
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, body)
    }

    fn get(uri: &str) -> Request<Full<Bytes>> {
        Request::get(uri).body(Full::new(Bytes::new())).unwrap()
    }

    fn upload(file: &str, body: &'static [u8]) -> Request<Full<Bytes>> {
        Request::post(format!("/api/upload?file={file}"))
            .header("Content-Length", body.len())
            .body(Full::new(Bytes::from_static(body)))
            .unwrap()
    }

    fn history_count(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path().join("history")).map_or(0, Iterator::count)
    }

    #[test]
    fn test_match_route_liveness() {
        let routes = routes();
        for path in ["/csv", "/csv/", "/Kwal/csv", "/Kwal/csv/"] {
            assert_eq!(match_route(&Method::GET, path, &routes), Route::Liveness, "{path}");
        }
    }

    #[test]
    fn test_match_route_serve() {
        let routes = routes();
        assert_eq!(
            match_route(&Method::GET, "/csv/light_colors.csv", &routes),
            Route::Serve("light_colors.csv")
        );
        assert_eq!(
            match_route(&Method::GET, "/Kwal/csv/done/a.csv", &routes),
            Route::Serve("done/a.csv")
        );
        assert_eq!(match_route(&Method::GET, "/csvx", &routes), Route::NotFound);
        assert_eq!(match_route(&Method::GET, "/Kwal", &routes), Route::NotFound);
    }

    #[test]
    fn test_match_route_api() {
        let routes = routes();
        assert_eq!(match_route(&Method::GET, "/api/move", &routes), Route::Move);
        assert_eq!(match_route(&Method::GET, "/api/moveit", &routes), Route::Move);
        assert_eq!(match_route(&Method::POST, "/api/upload", &routes), Route::Upload);
        assert_eq!(match_route(&Method::POST, "/api/upload/", &routes), Route::NotFound);
        assert_eq!(match_route(&Method::GET, "/api/upload", &routes), Route::NotFound);
        assert_eq!(match_route(&Method::POST, "/csv/a.csv", &routes), Route::NotFound);
        assert_eq!(match_route(&Method::PUT, "/api/upload", &routes), Route::NotFound);
    }

    #[test]
    fn test_query_param() {
        assert_eq!(query_param(Some("file=a.csv"), "file"), "a.csv");
        assert_eq!(query_param(Some("x=1&file=b.csv&file=c.csv"), "file"), "b.csv");
        assert_eq!(query_param(Some("file=my%20file.csv"), "file"), "my file.csv");
        assert_eq!(query_param(Some("file=a+b"), "file"), "a b");
        assert_eq!(query_param(Some("file=..%2Fetc"), "file"), "../etc");
        assert_eq!(query_param(Some("file"), "file"), "");
        assert_eq!(query_param(Some("other=1"), "file"), "");
        assert_eq!(query_param(None, "file"), "");
    }

    #[test]
    fn test_declared_content_length() {
        let mut headers = HeaderMap::new();
        assert!(declared_content_length(&headers, 1_000_000).is_err());

        headers.insert(CONTENT_LENGTH, "0".parse().unwrap());
        assert!(declared_content_length(&headers, 1_000_000).is_err());

        headers.insert(CONTENT_LENGTH, "1000001".parse().unwrap());
        assert!(declared_content_length(&headers, 1_000_000).is_err());

        headers.insert(CONTENT_LENGTH, "abc".parse().unwrap());
        assert!(declared_content_length(&headers, 1_000_000).is_err());

        headers.insert(CONTENT_LENGTH, "1000000".parse().unwrap());
        assert_eq!(declared_content_length(&headers, 1_000_000).unwrap(), 1_000_000);
    }

    #[tokio::test]
    async fn test_liveness_ack() {
        let (_dir, state) = setup();
        let (status, _, body) = send(&state, get("/Kwal/csv/")).await;
        assert_eq!(status, 200);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_unmatched_route() {
        let (_dir, state) = setup();
        let (status, _, body) = send(&state, get("/index.html")).await;
        assert_eq!(status, 404);
        assert_eq!(body, "not found");
    }

    #[tokio::test]
    async fn test_identical_upload_is_idempotent() {
        let (dir, state) = setup();

        let (status, _, body) = send(&state, upload("light_patterns.csv", b"id,name\n1,fade\n")).await;
        assert_eq!((status, body), (200, Bytes::from_static(b"saved")));

        let (status, _, body) = send(&state, upload("light_patterns.csv", b"id,name\n1,fade\n")).await;
        assert_eq!((status, body), (200, Bytes::from_static(b"unchanged")));
        assert_eq!(history_count(&dir), 0);
    }

    #[tokio::test]
    async fn test_changed_upload_archives_previous_version() {
        let (dir, state) = setup();

        send(&state, upload("light_colors.csv", b"A")).await;
        let (status, _, body) = send(&state, upload("light_colors.csv", b"B")).await;
        assert_eq!((status, body), (200, Bytes::from_static(b"saved")));

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("history"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(std::fs::read(&entries[0]).unwrap(), b"A");
        assert_eq!(std::fs::read(dir.path().join("light_colors.csv")).unwrap(), b"B");
    }

    #[tokio::test]
    async fn test_upload_allow_list() {
        let (dir, state) = setup();
        for name in ["other.csv", "LIGHT_COLORS.CSV", "light_colors.csv.bak"] {
            let (status, _, body) = send(&state, upload(name, b"x")).await;
            assert_eq!(status, 403, "{name}");
            assert_eq!(body, "file not allowed");
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_rejects_unsafe_filenames() {
        let (dir, state) = setup();
        for name in ["", "a%2Fb.csv", "..%2Flight_colors.csv", "light..csv"] {
            let (status, _, body) = send(&state, upload(name, b"x")).await;
            assert_eq!(status, 400, "{name}");
            assert_eq!(body, "bad filename");
        }
        let (status, _, _) = send(
            &state,
            Request::post("/api/upload")
                .header("Content-Length", 1)
                .body(Full::new(Bytes::from_static(b"x")))
                .unwrap(),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_content_length_bounds() {
        let (dir, state) = setup();

        let empty = Request::post("/api/upload?file=light_colors.csv")
            .header("Content-Length", 0)
            .body(Full::new(Bytes::new()))
            .unwrap();
        let (status, _, body) = send(&state, empty).await;
        assert_eq!((status, body), (400, Bytes::from_static(b"bad content length")));

        let missing = Request::post("/api/upload?file=light_colors.csv")
            .body(Full::new(Bytes::from_static(b"data")))
            .unwrap();
        let (status, _, _) = send(&state, missing).await;
        assert_eq!(status, 400);

        let oversized = Request::post("/api/upload?file=light_colors.csv")
            .header("Content-Length", 1_000_001)
            .body(Full::new(Bytes::from_static(b"small")))
            .unwrap();
        let (status, _, body) = send(&state, oversized).await;
        assert_eq!((status, body), (400, Bytes::from_static(b"bad content length")));

        assert!(!dir.path().join("light_colors.csv").exists());
    }

    #[tokio::test]
    async fn test_upload_body_mismatch_rejected() {
        let (dir, state) = setup();
        let short = Request::post("/api/upload?file=light_colors.csv")
            .header("Content-Length", 10)
            .body(Full::new(Bytes::from_static(b"abc")))
            .unwrap();
        let (status, _, _) = send(&state, short).await;
        assert_eq!(status, 400);

        let long = Request::post("/api/upload?file=light_colors.csv")
            .header("Content-Length", 2)
            .body(Full::new(Bytes::from_static(b"abc")))
            .unwrap();
        let (status, _, _) = send(&state, long).await;
        assert_eq!(status, 400);
        assert!(!dir.path().join("light_colors.csv").exists());
    }

    #[tokio::test]
    async fn test_move_endpoint() {
        let (dir, state) = setup();
        std::fs::write(dir.path().join("calendar.csv"), b"rows").unwrap();

        let (status, _, body) = send(&state, get("/api/move?file=calendar.csv")).await;
        assert_eq!((status, body), (200, Bytes::from_static(b"ok")));
        assert!(!dir.path().join("calendar.csv").exists());
        assert_eq!(std::fs::read(dir.path().join("done/calendar.csv")).unwrap(), b"rows");

        let (status, _, body) = send(&state, get("/api/move?file=calendar.csv")).await;
        assert_eq!((status, body), (404, Bytes::from_static(b"not found")));
    }

    #[tokio::test]
    async fn test_move_rejects_unsafe_filenames() {
        let (_dir, state) = setup();
        for uri in ["/api/move", "/api/move?file=", "/api/move?file=a/b", "/api/move?file=..%2Fx"] {
            let (status, _, body) = send(&state, get(uri)).await;
            assert_eq!((status, body), (400, Bytes::from_static(b"bad file")), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_serve_content_type_and_route_equivalence() {
        let (dir, state) = setup();
        std::fs::write(dir.path().join("light_colors.csv"), b"red,255\n").unwrap();
        std::fs::write(dir.path().join("LEDMAP.CSV"), b"0,0\n").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"hello").unwrap();

        let short = send(&state, get("/csv/light_colors.csv")).await;
        let long = send(&state, get("/Kwal/csv/light_colors.csv")).await;
        assert_eq!(short, long);
        assert_eq!(short.0, 200);
        assert_eq!(short.1.as_deref(), Some("text/csv"));
        assert_eq!(short.2, "red,255\n");

        let (_, content_type, _) = send(&state, get("/csv/LEDMAP.CSV")).await;
        assert_eq!(content_type.as_deref(), Some("text/csv"));

        let (_, content_type, body) = send(&state, get("/csv/readme.txt")).await;
        assert_eq!(content_type.as_deref(), Some("text/plain"));
        assert_eq!(body, "hello");

        let (status, _, body) = send(&state, get("/Kwal/csv/missing.csv")).await;
        assert_eq!((status, body), (404, Bytes::from_static(b"not found")));
    }

    #[tokio::test]
    async fn test_serve_blocks_traversal() {
        let outer = tempfile::tempdir().unwrap();
        let base = outer.path().join("csv");
        std::fs::create_dir(&base).unwrap();
        std::fs::write(outer.path().join("secret.txt"), b"secret").unwrap();
        let state = Arc::new(AppState::new(&Config::with_base_dir(&base)));

        let (status, _, body) = send(&state, get("/csv/../secret.txt")).await;
        assert_eq!(status, 404);
        assert_ne!(body, "secret");
    }
}
