//! Browser front end.
//!
//! | Method | Path     | Description                                         |
//! |--------|----------|-----------------------------------------------------|
//! | `GET`  | `/`      | Upload form (file, question, answer area)           |
//! | `POST` | `/query` | Multipart `file` + `query`, answers `{"answer": ..}` |
//!
//! Failures never change the response shape: the message goes into the
//! `answer` field as `Error: <message>` and the status code tells them apart
//! (400 bad form, 502 upstream or credentials, 500 anything else).

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::{
    api::generate_answer,
    config::NutshellConfig,
    error::{NutshellError, Result},
    interactions::InteractionLog,
};

pub const NO_FILE_MESSAGE: &str = "Please upload a file.";

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Discuss in a nutshell</title>
<style>
  body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }
  textarea, input[type=text] { width: 100%; }
  #answer { white-space: pre-wrap; border: 1px solid #ccc; padding: 1rem; min-height: 6rem; }
</style>
</head>
<body>
<h1>Ask about a post</h1>
<form id="ask">
  <p><input type="file" name="file"></p>
  <p><input type="text" name="query" placeholder="Your question"></p>
  <p><button type="submit">Submit</button></p>
</form>
<div id="answer"></div>
<script>
document.getElementById("ask").addEventListener("submit", async (event) => {
  event.preventDefault();
  const out = document.getElementById("answer");
  out.textContent = "...";
  const response = await fetch("/query", { method: "POST", body: new FormData(event.target) });
  const body = await response.json();
  out.textContent = body.answer;
});
</script>
</body>
</html>
"#;

#[derive(Clone)]
struct AppState {
    config: Arc<NutshellConfig>,
}

#[derive(Debug, Serialize)]
struct AnswerBody {
    answer: String,
}

/// A file received through the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Client-side file name, logged as `post_name`.
    pub name: String,
    pub text: String,
}

#[derive(Debug, Default)]
struct QueryForm {
    file: Option<UploadedFile>,
    query: String,
}

/// Build the router; separate from [`run_server`] so tests can bind their own listener.
pub fn router(config: NutshellConfig) -> Router {
    let body_limit = DefaultBodyLimit::max(config.max_upload_bytes);
    let state = AppState {
        config: Arc::new(config),
    };
    Router::new()
        .route("/", get(index))
        .route("/query", post(query))
        .layer(body_limit)
        .with_state(state)
}

/// Serve the UI on `config.bind` until the process is stopped.
pub async fn run_server(config: &NutshellConfig) -> Result<()> {
    let listener = TcpListener::bind(&config.bind)
        .await
        .map_err(|e| NutshellError::configuration(format!("cannot bind {}: {e}", config.bind)))?;
    info!("Browser UI listening on http://{}", config.bind);

    axum::serve(listener, router(config.clone()))
        .await
        .map_err(|e| NutshellError::upstream(format!("server stopped: {e}")))
}

/// Answer `query` about an uploaded file and log the exchange under its name.
///
/// The SQLite write runs on the blocking pool so a locked log cannot stall
/// the runtime's worker threads.
pub async fn answer_upload(
    config: &NutshellConfig,
    file: &UploadedFile,
    query: &str,
) -> Result<String> {
    let answer = generate_answer(config, None, &file.text, query).await?;

    let log = InteractionLog::from_config(config);
    let post_name = file.name.clone();
    let query = query.to_string();
    let full_context = format!("{}{query}", file.text);
    let response = answer.clone();
    tokio::task::spawn_blocking(move || log.log(&post_name, &query, &full_context, &response))
        .await
        .map_err(|e| NutshellError::Io(std::io::Error::other(e)))??;

    Ok(answer)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn query(State(state): State<AppState>, multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => return reply(StatusCode::BAD_REQUEST, format!("Error: {e}")),
    };
    let Some(file) = form.file else {
        return reply(StatusCode::BAD_REQUEST, NO_FILE_MESSAGE.to_string());
    };

    match answer_upload(&state.config, &file, &form.query).await {
        Ok(answer) => reply(StatusCode::OK, answer),
        Err(e) => {
            warn!(post_name = %file.name, "Query failed: {e}");
            let status = if e.is_external() {
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            reply(status, format!("Error: {e}"))
        }
    }
}

async fn read_form(mut multipart: Multipart) -> std::result::Result<QueryForm, MultipartError> {
    let mut form = QueryForm::default();
    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                // Browsers send an empty part with no file name when nothing was picked.
                let name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                if !name.is_empty() {
                    form.file = Some(UploadedFile {
                        name,
                        text: String::from_utf8_lossy(&bytes).into_owned(),
                    });
                }
            }
            "query" => form.query = field.text().await?,
            _ => {}
        }
    }
    Ok(form)
}

fn reply(status: StatusCode, answer: String) -> Response {
    (status, Json(AnswerBody { answer })).into_response()
}
