//! Public link serving.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};

use defdrive_core::error::AppError;
use defdrive_service::{Caller, LinkOutcome, ServedFile};

use crate::error::{ApiError, deny_response};
use crate::extractors::{ClientIp, OptionalAuthUser};
use crate::state::AppState;

/// GET /link/{link}
///
/// Streams the file when every restriction on the link passes. Refusals
/// answer `{"error": <reason>, "message": ...}` with 403, or 404 for an
/// unknown link.
pub async fn serve_link(
    State(state): State<AppState>,
    Path(link): Path<String>,
    ClientIp(client_ip): ClientIp,
    OptionalAuthUser(auth): OptionalAuthUser,
) -> Result<Response, ApiError> {
    let caller = match auth {
        Some(ctx) => Caller::User(ctx.user_id),
        None => Caller::Anonymous,
    };

    match state
        .link_service
        .handle_link_request(&link, &client_ip.to_string(), caller)
        .await?
    {
        LinkOutcome::Serve(served) => Ok(attachment(served)?),
        LinkOutcome::Deny(reason) => Ok(deny_response(reason)),
    }
}

fn attachment(served: ServedFile) -> Result<Response, AppError> {
    let ServedFile { file, stream } = served;

    let content_type = HeaderValue::from_str(file.content_type())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&content_disposition(&file.name))
        .map_err(|e| AppError::internal(format!("Invalid file name header: {e}")))?;

    let mut response = Body::from_stream(stream).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(file.size_bytes));
    Ok(response)
}

/// `attachment` disposition with an ASCII fallback name and the RFC 5987
/// UTF-8 form for everything else.
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }

    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}
