use std::path::Path;
use std::sync::Arc;

use axum::Form;
use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use indicatif::ProgressBar;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::AppState;
use super::render::{DocumentEntry, DocumentNotice, PageStatus, render_page};
use super::session::{ChatOutcome, session_cookie, session_from_headers};
use crate::error::remediation_hint;
use crate::models::DocumentFormat;
use crate::sources::DocumentLoader;

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    pub name: String,
}

pub async fn index(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (session, is_new) = resolve_session(&headers);
    let log = state.sessions.log(session).await;
    let config = state.engine.config();

    let status = PageStatus {
        model: state.engine.generator().model().to_string(),
        generation_url: state.engine.generator().base_url().to_string(),
        documents_path: config.indexing.documents_path.display().to_string(),
        indexed_chunks: indexed_chunks(&state),
        documents: document_entries(&state),
        notice: state.notice.read().await.clone(),
    };

    let response = Html(render_page(&status, &log)).into_response();
    with_session_cookie(response, session, is_new)
}

pub async fn ask(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<AskForm>,
) -> Response {
    let (session, is_new) = resolve_session(&headers);
    let question = form.question.trim().to_string();

    if !question.is_empty() {
        let outcome = {
            let _gate = state.query_gate.lock().await;
            match state.engine.query(&question).await {
                Ok(result) => ChatOutcome::Answer {
                    answer: result.answer,
                    sources: result.sources,
                },
                Err(e) => {
                    tracing::warn!("Query failed: {}", e);
                    ChatOutcome::Error {
                        message: with_hint(anyhow::Error::new(e)),
                    }
                }
            }
        };
        state.sessions.append(session, question, outcome).await;
    }

    with_session_cookie(Redirect::to("/").into_response(), session, is_new)
}

pub async fn clear(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (session, is_new) = resolve_session(&headers);
    state.sessions.clear(session).await;
    with_session_cookie(Redirect::to("/").into_response(), session, is_new)
}

/// Rebuild the index from the documents directory.
pub async fn reindex(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (session, is_new) = resolve_session(&headers);
    let notice = rebuild(&state).await;
    *state.notice.write().await = Some(notice);
    with_session_cookie(Redirect::to("/").into_response(), session, is_new)
}

/// Save uploaded files into the documents directory, then rebuild.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let (session, is_new) = resolve_session(&headers);

    let notice = match save_uploads(&state, multipart).await {
        Ok((saved, rejected)) if saved.is_empty() => {
            let message = if rejected.is_empty() {
                "No files were uploaded.".to_string()
            } else {
                format!("Unsupported file types: {}", rejected.join(", "))
            };
            DocumentNotice::Rejected(message)
        }
        Ok((saved, rejected)) => {
            tracing::info!("Saved {} uploaded files", saved.len());
            if !rejected.is_empty() {
                tracing::warn!("Ignored unsupported uploads: {}", rejected.join(", "));
            }
            rebuild(&state).await
        }
        Err(message) => {
            tracing::warn!("Upload failed: {}", message);
            DocumentNotice::Rejected(format!("Upload failed: {}", message))
        }
    };
    *state.notice.write().await = Some(notice);

    with_session_cookie(Redirect::to("/").into_response(), session, is_new)
}

/// Remove one listed document. The index is left as is until the next rebuild.
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<DeleteForm>,
) -> Response {
    let (session, is_new) = resolve_session(&headers);

    // Only names from the listing are accepted, so paths cannot escape the directory.
    let listed = document_entries(&state)
        .into_iter()
        .any(|doc| doc.name == form.name);

    let notice = if !listed {
        DocumentNotice::Rejected(format!("{} is not in the documents directory", form.name))
    } else {
        let path = state.engine.config().indexing.documents_path.join(&form.name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("Deleted {}", path.display());
                DocumentNotice::Deleted(form.name)
            }
            Err(e) => {
                tracing::warn!("Failed to delete {}: {}", path.display(), e);
                DocumentNotice::Rejected(format!("Failed to delete {}: {}", form.name, e))
            }
        }
    };
    *state.notice.write().await = Some(notice);

    with_session_cookie(Redirect::to("/").into_response(), session, is_new)
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let chunks = indexed_chunks(&state);
    Json(json!({
        "status": "ok",
        "model": state.engine.generator().model(),
        "index": {
            "present": chunks.is_some_and(|n| n > 0),
            "chunks": chunks.unwrap_or(0),
        },
        "sessions": state.sessions.session_count().await,
    }))
}

fn indexed_chunks(state: &AppState) -> Option<u64> {
    match state.engine.index().stats() {
        Ok(stats) => stats.map(|s| s.entries),
        Err(e) => {
            tracing::warn!("Failed to read index: {}", e);
            None
        }
    }
}

async fn rebuild(state: &AppState) -> DocumentNotice {
    let documents_path = &state.engine.config().indexing.documents_path;
    let _gate = state.query_gate.lock().await;

    match state
        .engine
        .build_index(documents_path, &ProgressBar::hidden())
        .await
    {
        Ok(report) => {
            tracing::info!(
                "Reindexed {} documents into {} chunks",
                report.documents,
                report.chunks
            );
            DocumentNotice::Reindexed(report)
        }
        Err(e) => {
            tracing::warn!("Reindex failed: {}", e);
            DocumentNotice::ReindexFailed(with_hint(anyhow::Error::new(e)))
        }
    }
}

/// Write every supported file part to the documents directory. Returns the
/// saved and the rejected file names.
async fn save_uploads(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<(Vec<String>, Vec<String>), String> {
    let documents_path = &state.engine.config().indexing.documents_path;
    let mut saved = Vec::new();
    let mut rejected = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let Some(name) = field
            .file_name()
            .and_then(|n| Path::new(n).file_name())
            .map(|n| n.to_string_lossy().into_owned())
        else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        if DocumentFormat::from_path(Path::new(&name)).is_none() {
            rejected.push(name);
            continue;
        }

        let bytes = field.bytes().await.map_err(|e| e.to_string())?;
        tokio::fs::create_dir_all(documents_path)
            .await
            .map_err(|e| e.to_string())?;
        let target = documents_path.join(&name);
        tokio::fs::write(&target, &bytes)
            .await
            .map_err(|e| format!("{}: {}", target.display(), e))?;
        tracing::debug!("Saved upload {} ({} bytes)", target.display(), bytes.len());
        saved.push(name);
    }

    Ok((saved, rejected))
}

fn document_entries(state: &AppState) -> Vec<DocumentEntry> {
    let indexing = &state.engine.config().indexing;
    let root = &indexing.documents_path;

    match DocumentLoader::from_config(indexing).collect_files(root) {
        Ok((files, _)) => files
            .into_iter()
            .map(|(path, _)| DocumentEntry {
                name: path
                    .strip_prefix(root)
                    .unwrap_or(&path)
                    .display()
                    .to_string(),
                size_bytes: std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0),
            })
            .collect(),
        Err(e) => {
            tracing::debug!("Cannot list documents: {}", e);
            Vec::new()
        }
    }
}

fn with_hint(err: anyhow::Error) -> String {
    match remediation_hint(&err) {
        Some(hint) => format!("{}\nHint: {}", err, hint),
        None => err.to_string(),
    }
}

fn resolve_session(headers: &HeaderMap) -> (Uuid, bool) {
    match session_from_headers(headers) {
        Some(id) => (id, false),
        None => (Uuid::new_v4(), true),
    }
}

fn with_session_cookie(mut response: Response, session: Uuid, is_new: bool) -> Response {
    if is_new && let Ok(value) = HeaderValue::from_str(&session_cookie(session)) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}
