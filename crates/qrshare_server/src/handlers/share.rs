//! Share HTTP handlers.

use super::negotiate::wants_html;
use super::origin::{request_origin, share_url};
use crate::{error::HttpError, AppError, AppState};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use qrshare_core::{
    models::share::{LookupQuery, PublishRequest, PublishResponse, ShareResponse},
    share::requested_id,
    BlobMeta, SHARE_IMAGE_MAX_AGE_SECONDS,
};
use serde_json::json;

fn rejection_response(rejection: JsonRejection) -> Response {
    let status = rejection.status();
    tracing::debug!(%status, "rejected publish body: {}", rejection.body_text());
    let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "Share too large".to_string()
    } else {
        rejection.body_text()
    };
    (status, Json(json!({ "error": message }))).into_response()
}

fn header_value(value: &str) -> Result<HeaderValue, HttpError> {
    HeaderValue::from_str(value).map_err(|err| {
        AppError::StorageMessage(format!("Invalid stored header value '{}': {}", value, err))
            .into()
    })
}

fn cache_control() -> HeaderValue {
    HeaderValue::from_str(&format!("public, max-age={}", SHARE_IMAGE_MAX_AGE_SECONDS))
        .unwrap_or_else(|_| HeaderValue::from_static("public"))
}

/// Whether `If-None-Match` already names the current representation.
///
/// Uses the weak comparison function, so `W/"x"` matches `"x"`.
fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    let strip_weak = |tag: &str| tag.trim().trim_start_matches("W/").to_string();
    let current = strip_weak(etag);
    if_none_match
        .split(',')
        .map(str::trim)
        .any(|candidate| candidate == "*" || strip_weak(candidate) == current)
}

/// Publish a share, or return the existing one for identical content.
///
/// # Arguments
/// - `state`: Shared application state.
/// - `headers`: Request headers, used to derive the share origin.
/// - `payload`: Text plus raster data URL and SVG markup.
///
/// # Returns
/// `{ id, url, expiresIn, expiresAt }` for the stored share.
///
/// # Errors
/// 400 when either encoding is missing, 413 when the body exceeds the
/// configured limit, 500 when decoding or storage fails.
pub async fn publish_share(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<PublishRequest>, JsonRejection>,
) -> Result<Response, HttpError> {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return Ok(rejection_response(rejection)),
    };

    let published = state.shares.publish(request)?;
    let origin = request_origin(state.config.public_url.as_deref(), &headers);
    let response = PublishResponse {
        url: share_url(&origin, &published.record.id),
        id: published.record.id,
        expires_in: published.expires_in,
        expires_at: published.expires_at,
    };
    Ok(Json(response).into_response())
}

/// Return the full metadata of a live share.
///
/// # Returns
/// `{ id, text, dataUrl, svgString, url, created, expiresAt }`.
///
/// # Errors
/// 400 when neither `id` nor `share` is given, 404 when the share is
/// unknown, malformed, expired, or incomplete.
pub async fn get_share(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LookupQuery>,
) -> Result<Json<ShareResponse>, HttpError> {
    let id = requested_id(query.id, query.share)
        .ok_or_else(|| AppError::BadRequest("Missing id".to_string()))?;

    let record = state.shares.lookup(&id)?;
    let (expires_at, _) = state.shares.expiry_of(&record);
    let origin = request_origin(state.config.public_url.as_deref(), &headers);
    Ok(Json(ShareResponse {
        url: share_url(&origin, &record.id),
        id: record.id,
        text: record.text,
        data_url: record.data_url,
        svg_string: record.svg_string,
        created: record.created_at,
        expires_at,
    }))
}

/// Resolve a public share link.
///
/// Browsers (or requesters without a preference) are redirected to the web
/// app with `?share=<id>`; everyone else receives the raster bytes.
///
/// # Errors
/// 404 when the share or its image is missing, in either branch.
pub async fn open_share(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, HttpError> {
    let record = state.shares.lookup(&id)?;
    let meta = state.shares.blob_meta(&record)?;

    let accept = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok());
    if wants_html(accept) {
        let location = header_value(&format!("/?share={}", record.id))?;
        return Ok((
            StatusCode::FOUND,
            [
                (header::LOCATION, location),
                (header::VARY, HeaderValue::from_static("accept")),
            ],
        )
            .into_response());
    }

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| etag_matches(value, &meta.etag));
    if not_modified {
        return Ok((StatusCode::NOT_MODIFIED, cache_headers(&meta)?).into_response());
    }

    let object = state.shares.fetch_blob(&record)?;
    let mut response = (cache_headers(&object.meta)?, object.bytes).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header_value(&object.meta.content_type)?,
    );
    Ok(response)
}

fn cache_headers(meta: &BlobMeta) -> Result<[(header::HeaderName, HeaderValue); 3], HttpError> {
    Ok([
        (header::ETAG, header_value(&meta.etag)?),
        (header::CACHE_CONTROL, cache_control()),
        (header::VARY, HeaderValue::from_static("accept")),
    ])
}

#[cfg(test)]
mod tests {
    use super::etag_matches;

    #[test]
    fn etag_matching_handles_lists_wildcards_and_weak_tags() {
        let etag = "\"abc\"";
        assert!(etag_matches("\"abc\"", etag));
        assert!(etag_matches("\"zzz\", \"abc\"", etag));
        assert!(etag_matches("W/\"abc\"", etag));
        assert!(etag_matches("*", etag));
        assert!(!etag_matches("\"abd\"", etag));
        assert!(!etag_matches("", etag));
    }
}
