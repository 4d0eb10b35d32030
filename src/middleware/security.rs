use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

/// Dashboard responses carry live cache contents, so intermediaries must
/// never store them; the rest is standard hardening for an internal tool.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert("Cache-Control", HeaderValue::from_static("no-store"));

    response
}
