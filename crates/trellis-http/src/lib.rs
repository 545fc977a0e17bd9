//! axum adapter for the attachment sub-resource.
//!
//! Routes live under `/{entity}/{id}/{property}/file`. Store and repository
//! work is synchronous and runs on the blocking pool.

use axum::{
    Json, Router,
    body::{Body, HttpBody as _},
    extract::{
        DefaultBodyLimit, FromRequest, Multipart, Path, Request, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use std::{io, sync::Arc};
use tokio::net::TcpListener;
use trellis_core::{
    FILE_SEGMENT,
    attachment::{AttachmentResource, UploadedFile, UploadedPart},
    error::{ErrorClass, ErrorOrigin, InternalError},
    storage::BufferedResponse,
};

/// Allowance for multipart framing and the JSON envelope around content.
pub const ENVELOPE_BYTES: usize = 64 * 1024;

type SharedResource = Arc<AttachmentResource>;
type Target = (String, String, String);

/// Build the attachment router.
#[must_use]
pub fn router(resource: SharedResource) -> Router {
    let limit = body_limit(resource.config().max_upload_bytes);

    Router::new()
        .route(
            &format!("/{{entity}}/{{id}}/{{property}}/{FILE_SEGMENT}"),
            get(fetch).delete(delete).post(upload).put(commit),
        )
        .layer(DefaultBodyLimit::max(limit))
        .with_state(resource)
}

/// Serve the attachment router on `listener` until the server stops.
pub async fn serve(listener: TcpListener, resource: SharedResource) -> io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "serving attachment routes");
    }

    axum::serve(listener, router(resource)).await
}

// Content travels base64-encoded in commit bodies.
const fn body_limit(max_upload_bytes: usize) -> usize {
    (max_upload_bytes / 3 + 1)
        .saturating_mul(4)
        .saturating_add(ENVELOPE_BYTES)
}

#[tracing::instrument(skip(resource))]
async fn fetch(
    State(resource): State<SharedResource>,
    Path((entity, id, property)): Path<Target>,
) -> Result<Response, ApiError> {
    let channel = blocking(move || {
        let mut channel = BufferedResponse::new();
        resource.fetch(&entity, &id, &property, &mut channel)?;

        Ok(channel)
    })
    .await?;

    let mut response = Response::new(Body::from(channel.body));
    for (name, value) in channel.headers {
        let name = HeaderName::try_from(name).map_err(header_error)?;
        let value = HeaderValue::try_from(value).map_err(header_error)?;
        response.headers_mut().insert(name, value);
    }

    Ok(response)
}

#[tracing::instrument(skip(resource))]
async fn delete(
    State(resource): State<SharedResource>,
    Path((entity, id, property)): Path<Target>,
) -> Result<StatusCode, ApiError> {
    blocking(move || resource.delete(&entity, &id, &property)).await?;

    Ok(StatusCode::OK)
}

#[tracing::instrument(skip(resource, request))]
async fn upload(
    State(resource): State<SharedResource>,
    Path((entity, id, property)): Path<Target>,
    request: Request,
) -> Result<Json<UploadedFile>, ApiError> {
    // An empty body carries no parts; multipart framing would reject it.
    let parts = if request.body().size_hint().exact() == Some(0) {
        Vec::new()
    } else {
        read_parts(Multipart::from_request(request, &()).await?).await?
    };

    let file = resource.replace(&entity, parts)?;

    Ok(Json(file))
}

async fn read_parts(mut multipart: Multipart) -> Result<Vec<UploadedPart>, ApiError> {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;

        parts.push(UploadedPart {
            name,
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Ok(parts)
}

#[tracing::instrument(skip(resource, file), fields(file_name = %file.file_name, bytes = file.len()))]
async fn commit(
    State(resource): State<SharedResource>,
    Path((entity, id, property)): Path<Target>,
    Json(file): Json<UploadedFile>,
) -> Result<StatusCode, ApiError> {
    blocking(move || resource.commit(&entity, &id, &property, file)).await?;

    Ok(StatusCode::OK)
}

async fn blocking<T>(
    f: impl FnOnce() -> Result<T, InternalError> + Send + 'static,
) -> Result<T, ApiError>
where
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f).await.map_err(|e| {
        InternalError::new(
            ErrorClass::Internal,
            ErrorOrigin::Resource,
            format!("blocking task failed: {e}"),
        )
    })?;

    Ok(result?)
}

fn header_error(err: impl std::fmt::Display) -> ApiError {
    ApiError::Core(InternalError::new(
        ErrorClass::Internal,
        ErrorOrigin::Resource,
        format!("invalid response header: {err}"),
    ))
}

///
/// ApiError
///

#[derive(Debug)]
pub enum ApiError {
    Core(InternalError),
    Multipart(MultipartError),
    MultipartRejection(MultipartRejection),
}

impl From<InternalError> for ApiError {
    fn from(err: InternalError) -> Self {
        Self::Core(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::Multipart(err)
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::MultipartRejection(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Core(err) => {
                let status = StatusCode::from_u16(err.class.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                if status.is_server_error() {
                    tracing::error!(error = %err.display_with_class(), "attachment request failed");
                }

                let body = serde_json::json!({
                    "error": err.message,
                    "class": err.class.to_string(),
                });

                (status, Json(body)).into_response()
            }
            Self::Multipart(err) => {
                tracing::warn!(error = %err.body_text(), "malformed multipart upload");
                err.into_response()
            }
            Self::MultipartRejection(rejection) => {
                tracing::warn!(error = %rejection.body_text(), "upload is not multipart");
                rejection.into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_limit_covers_base64_expansion() {
        let limit = body_limit(300);

        assert!(limit >= 400 + ENVELOPE_BYTES);
        assert_eq!(body_limit(usize::MAX), usize::MAX);
    }

    #[test]
    fn core_errors_map_to_their_status() {
        let cases = [
            (InternalError::entity_not_found("Invoice", "1"), 404),
            (InternalError::method_not_allowed("no"), 405),
            (InternalError::payload_too_large(2, 1), 413),
            (InternalError::storage("disk"), 500),
        ];

        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status().as_u16(), status);
        }
    }
}
