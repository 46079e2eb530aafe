use axum::{
    body::Body,
    extract::Request,
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

pub async fn security_headers(req: Request, next: Next) -> Response {
    // Reject TRACE and TRACK methods (proxy disclosure)
    let method = req.method();
    if method == "TRACE" || method == "TRACK" {
        return (StatusCode::METHOD_NOT_ALLOWED, Body::empty()).into_response();
    }

    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    // HSTS: 1 year, include subdomains
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        header::HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );

    // The player page and the uploaded audio come from this origin only
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        header::HeaderValue::from_static(
            "default-src 'self'; media-src 'self'; object-src 'none'; frame-ancestors 'none'",
        ),
    );

    headers.insert(
        header::REFERRER_POLICY,
        header::HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    headers.insert(
        header::HeaderName::from_static("permissions-policy"),
        header::HeaderValue::from_static("camera=(), microphone=(), geolocation=(), payment=()"),
    );

    // Prevent MIME sniffing, so an upload is only ever played as audio
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        header::HeaderValue::from_static("nosniff"),
    );

    headers.insert(
        header::X_FRAME_OPTIONS,
        header::HeaderValue::from_static("DENY"),
    );

    headers.insert(
        header::HeaderName::from_static("cross-origin-resource-policy"),
        header::HeaderValue::from_static("same-origin"),
    );

    // Suppress fingerprinting
    headers.insert(
        header::SERVER,
        header::HeaderValue::from_static("audio-upload-backend"),
    );

    response
}
