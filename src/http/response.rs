//! HTTP response building module
//!
//! Provides builders for the plaintext status responses and file responses.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use crate::exchange::ExchangeError;

/// Build a short plaintext response (`ok`, `saved`, `not found`, ...)
pub fn build_text_response(status: u16, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .header("Content-Length", body.len())
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            Response::new(Full::new(Bytes::from_static(body.as_bytes())))
        })
}

/// Build a 200 response carrying a file's bytes verbatim
pub fn build_file_response(data: Vec<u8>, content_type: &str) -> Response<Full<Bytes>> {
    let content_length = data.len();

    Response::builder()
        .status(200)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .body(Full::new(Bytes::from(data)))
        .unwrap_or_else(|e| {
            log_build_error(200, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Map an exchange error to its status code and body.
/// I/O failures are logged here since the client only sees a generic body.
pub fn build_error_response(err: &ExchangeError) -> Response<Full<Bytes>> {
    if let ExchangeError::Io(io_err) = err {
        crate::logger::log_error(&format!("Request failed: {io_err}"));
    }
    build_text_response(err.status(), err.body())
}

/// Log response build error
fn log_build_error(status: u16, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
