use std::sync::Arc;

use askama::Template;
use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, Request, State, multipart::MultipartRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::error::{AppError, Result};
use crate::media::resolve_mime_type;
use crate::models::{IncomingFile, NewUser, StoredFile, UserRecord};
use crate::pipeline::{BULK_MAX_FILES, UploadPipeline};
use crate::storage::is_record_id;

const PROFILE_FIELD: &str = "profile";
const PROFILES_FIELD: &str = "profiles";

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    users: Vec<UserRecord>,
}

#[derive(Template)]
#[template(path = "user.html")]
struct UserTemplate {
    user: UserRecord,
}

/// Text fields and files of one multipart request.
struct UploadForm {
    body: NewUser,
    files: Vec<IncomingFile>,
}

pub fn router(pipeline: Arc<UploadPipeline>, max_upload_bytes: usize) -> Router {
    let public_dir = pipeline.blobs().public_dir().to_path_buf();
    Router::new()
        .route("/", get(index))
        .route("/files", get(list_files))
        .route(
            "/single",
            post(upload_single).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(
            "/stream",
            post(upload_stream).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(
            "/bulk",
            post(upload_bulk).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/{id}", get(show_user))
        .fallback_service(ServeDir::new(public_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

pub async fn index(State(pipeline): State<Arc<UploadPipeline>>) -> Response {
    let rendered = match pipeline.records().find_all().await {
        Ok(users) => IndexTemplate { users }.render().map_err(AppError::from),
        Err(err) => Err(err),
    };
    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            tracing::error!("listing users failed: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

/// Detail view. Segments that cannot be record ids are public files first,
/// so root-level assets and blobs stored under a `.` prefix stay reachable.
pub async fn show_user(
    State(pipeline): State<Arc<UploadPipeline>>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Response> {
    if !is_record_id(&id) {
        let mut public = ServeDir::new(pipeline.blobs().public_dir());
        let response = public.try_call(request).await?;
        if response.status() != StatusCode::NOT_FOUND {
            return Ok(response.map(Body::new));
        }
    }
    let user = pipeline.records().find_by_id(&id).await?;
    Ok(Html(UserTemplate { user }.render()?).into_response())
}

pub async fn list_files(State(pipeline): State<Arc<UploadPipeline>>) -> Response {
    match pipeline.blobs().list().await {
        Ok(paths) => Json(paths).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

pub async fn upload_single(
    State(pipeline): State<Arc<UploadPipeline>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Redirect> {
    let form = read_upload_form(multipart, PROFILE_FIELD, 1).await?;
    let file = single_file(form.files)?;
    let record = pipeline.single(form.body, file).await?;
    Ok(Redirect::to(&format!("/{}", record.id)))
}

pub async fn upload_stream(
    State(pipeline): State<Arc<UploadPipeline>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Redirect> {
    let form = read_upload_form(multipart, PROFILE_FIELD, 1).await?;
    let file = single_file(form.files)?;
    let upload = pipeline.stream(form.body, file).await?;
    Ok(Redirect::to(&format!("/{}", upload.record.id)))
}

pub async fn upload_bulk(
    State(pipeline): State<Arc<UploadPipeline>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<StoredFile>>> {
    let form = read_upload_form(multipart, PROFILES_FIELD, BULK_MAX_FILES).await?;
    Ok(Json(pipeline.bulk(form.files).await?))
}

fn single_file(files: Vec<IncomingFile>) -> Result<IncomingFile> {
    files
        .into_iter()
        .next()
        .ok_or_else(|| AppError::MissingUpload(PROFILE_FIELD.to_string()))
}

/// Buffers the request. File parts are accepted only under `file_field`,
/// at most `max_files` of them; text parts fill the form body.
async fn read_upload_form(
    multipart: std::result::Result<Multipart, MultipartRejection>,
    file_field: &str,
    max_files: usize,
) -> Result<UploadForm> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!("not a multipart request: {rejection}");
        AppError::MissingUpload(file_field.to_string())
    })?;
    let mut body = NewUser::default();
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let Some(file_name) = field.file_name().map(str::to_string) else {
            let value = field.text().await?;
            if !body.set_field(&name, value) {
                tracing::debug!("ignoring unknown form field `{name}`");
            }
            continue;
        };
        let reported = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        if file_name.is_empty() {
            continue;
        }
        if name != file_field {
            return Err(AppError::UnexpectedField(name));
        }
        if files.len() == max_files {
            return Err(AppError::TooManyFiles {
                field: name,
                max: max_files,
            });
        }
        let mime_type = resolve_mime_type(reported.as_deref(), &bytes);
        files.push(IncomingFile::new(name, file_name, mime_type, bytes));
    }
    Ok(UploadForm { body, files })
}
