//! Response rewriting.
//!
//! # Responsibilities
//! - Apply the proxymap mimetype override to hijacked responses
//! - Set `Access-Control-Allow-Origin: *` on hijacked responses (fonts are
//!   CORS-checked by the rendering client even when same-origin in spirit;
//!   acceptable only because the rendering environment is controlled)
//! - Inject the animation-stopper footer into HTML bodies, fixing up
//!   `Content-Length`
//!
//! # Design Decisions
//! - Only bodies whose final Content-Type is exactly `text/html` are
//!   touched; everything else streams through with header rewrites alone
//! - Footer splicing is byte-level, so non-UTF-8 bodies survive untouched

use axum::body::Body;
use axum::http::{header, HeaderValue, Response};

use crate::routing::{Disposition, RequestClassification};

/// Injected in the footer of all HTML pages: disables CSS transitions and
/// animations so visual snapshots are deterministic.
pub const ANIMATION_STOPPER_HTML: &str = r#"<style type="text/css">
*, *::before, *::after {
	-moz-transition: none !important;
	transition: none !important;
	-moz-animation: none !important;
	animation: none !important;
}
</style>"#;

/// Apply post-response rewrites according to the request's classification.
///
/// Reads the full body only for HTML responses; an incomplete read fails
/// the request (the caller surfaces a gateway error), there is no partial
/// recovery.
pub async fn process(
    mut response: Response<Body>,
    classification: &RequestClassification,
) -> Result<Response<Body>, axum::Error> {
    if let Some(mimetype) = &classification.mimetype_override {
        match HeaderValue::from_str(mimetype) {
            Ok(value) => {
                response.headers_mut().insert(header::CONTENT_TYPE, value);
                if classification.disposition == Disposition::Hijacked {
                    response.headers_mut().insert(
                        header::ACCESS_CONTROL_ALLOW_ORIGIN,
                        HeaderValue::from_static("*"),
                    );
                }
            }
            Err(_) => {
                tracing::warn!(
                    mimetype,
                    url = %classification.original_url,
                    "ignoring unusable mimetype override"
                );
            }
        }
    }

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        == Some("text/html");
    if !is_html {
        return Ok(response);
    }

    let (mut parts, body) = response.into_parts();
    let html = axum::body::to_bytes(body, usize::MAX).await?;
    let new_html = inject_html_footer(&html, ANIMATION_STOPPER_HTML);

    // The body was consumed above, so the framing headers must describe
    // the buffered replacement.
    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(new_html.len()));
    parts.headers.remove(header::TRANSFER_ENCODING);

    Ok(Response::from_parts(parts, Body::from(new_html)))
}

/// Splice `footer` immediately before every `</body>` tag, or before every
/// `</html>` when no `</body>` exists. Bodies with neither tag are
/// returned byte-identical.
pub fn inject_html_footer(html: &[u8], footer: &str) -> Vec<u8> {
    if let Some(out) = splice_before_all(html, b"</body>", footer.as_bytes()) {
        return out;
    }
    if let Some(out) = splice_before_all(html, b"</html>", footer.as_bytes()) {
        return out;
    }
    html.to_vec()
}

/// Insert `insert` before every occurrence of `tag`, or `None` when the
/// tag does not occur.
fn splice_before_all(haystack: &[u8], tag: &[u8], insert: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    let mut from = 0;
    let mut found = false;
    while let Some(pos) = find_subslice(&haystack[from..], tag) {
        let abs = from + pos;
        out.extend_from_slice(&haystack[from..abs]);
        out.extend_from_slice(insert);
        out.extend_from_slice(tag);
        from = abs + tag.len();
        found = true;
    }
    if !found {
        return None;
    }
    out.extend_from_slice(&haystack[from..]);
    Some(out)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Rejection;

    fn classification(disposition: Disposition, mimetype: Option<&str>) -> RequestClassification {
        RequestClassification {
            disposition,
            mimetype_override: mimetype.map(String::from),
            original_url: "http://testserver/page".to_string(),
        }
    }

    async fn body_bytes(response: Response<Body>) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_footer_goes_before_body_tag() {
        let html = b"<html><body>hi</body></html>";
        let out = inject_html_footer(html, "<footer/>");
        assert_eq!(out, b"<html><body>hi<footer/></body></html>");
    }

    #[test]
    fn test_footer_falls_back_to_html_tag() {
        let html = b"<html>hi</html>";
        let out = inject_html_footer(html, "<footer/>");
        assert_eq!(out, b"<html>hi<footer/></html>");
    }

    #[test]
    fn test_footer_replaces_every_occurrence() {
        let html = b"<body>a</body><body>b</body>";
        let out = inject_html_footer(html, "<f/>");
        assert_eq!(out, b"<body>a<f/></body><body>b<f/></body>");
    }

    #[test]
    fn test_no_tags_leaves_bytes_identical() {
        // Deliberately not valid UTF-8.
        let body = [0x68, 0x69, 0xff, 0xfe, 0x00];
        let out = inject_html_footer(&body, "<footer/>");
        assert_eq!(out, body);
    }

    #[tokio::test]
    async fn test_hijacked_response_gets_override_and_cors() {
        let response = Response::builder()
            .header("Content-Type", "application/octet-stream")
            .body(Body::from("binary"))
            .unwrap();
        let class = classification(Disposition::Hijacked, Some("font/woff2"));

        let out = process(response, &class).await.unwrap();
        assert_eq!(
            out.headers().get("content-type").unwrap(),
            &HeaderValue::from_static("font/woff2")
        );
        assert_eq!(
            out.headers().get("access-control-allow-origin").unwrap(),
            &HeaderValue::from_static("*")
        );
        assert_eq!(body_bytes(out).await, b"binary");
    }

    #[tokio::test]
    async fn test_passthrough_html_gets_footer_and_length() {
        let html = "<html><body>hi</body></html>";
        let response = Response::builder()
            .header("Content-Type", "text/html")
            .body(Body::from(html))
            .unwrap();
        let class = classification(Disposition::LivePassthrough, None);

        let out = process(response, &class).await.unwrap();
        let expected = format!("<html><body>hi{}</body></html>", ANIMATION_STOPPER_HTML);
        assert_eq!(
            out.headers().get("content-length").unwrap(),
            &HeaderValue::from(expected.len())
        );
        assert_eq!(body_bytes(out).await, expected.as_bytes());
    }

    #[tokio::test]
    async fn test_overridden_html_mimetype_triggers_injection() {
        let response = Response::builder()
            .header("Content-Type", "text/plain")
            .body(Body::from("<html><body>x</body></html>"))
            .unwrap();
        let class = classification(Disposition::Hijacked, Some("text/html"));

        let out = process(response, &class).await.unwrap();
        let body = body_bytes(out).await;
        assert!(body
            .windows(ANIMATION_STOPPER_HTML.len())
            .any(|w| w == ANIMATION_STOPPER_HTML.as_bytes()));
    }

    #[tokio::test]
    async fn test_html_with_charset_is_not_touched() {
        let html = "<html><body>hi</body></html>";
        let response = Response::builder()
            .header("Content-Type", "text/html; charset=utf-8")
            .body(Body::from(html))
            .unwrap();
        let class = classification(Disposition::LivePassthrough, None);

        let out = process(response, &class).await.unwrap();
        assert_eq!(body_bytes(out).await, html.as_bytes());
    }

    #[tokio::test]
    async fn test_rejected_classification_changes_nothing() {
        let response = Response::builder()
            .header("Content-Type", "text/plain")
            .body(Body::from("nope"))
            .unwrap();
        let class = classification(
            Disposition::Rejected(Rejection::UnmappedLocal),
            None,
        );

        let out = process(response, &class).await.unwrap();
        assert_eq!(
            out.headers().get("content-type").unwrap(),
            &HeaderValue::from_static("text/plain")
        );
        assert_eq!(body_bytes(out).await, b"nope");
    }
}
