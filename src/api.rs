//! # API Module
//!
//! This module handles interactions with the answer-generation service: an
//! OpenAI-compatible chat-completions endpoint (Gemini's compatibility API by
//! default).
//!
//! A question is always asked about one file: the file's text and the
//! question are sent as two user turns, and the reply is logged to the
//! [`InteractionLog`] together with the file name.
//!
//! # Example
//!
//! ```no_run
//! use discuss_nutshell::api::query_file;
//! use discuss_nutshell::config::NutshellConfig;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = NutshellConfig { api_key: Some("...".into()), ..NutshellConfig::default() };
//! let answer = query_file(&config, "data/post_11.txt".as_ref(), "Who is the author?", None).await?;
//! println!("{answer}");
//! # Ok(()) }
//! ```

use std::{fs, path::Path};

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequestArgs,
    },
};
use tracing::debug;

use crate::{
    config::NutshellConfig,
    error::{NutshellError, Result},
    interactions::InteractionLog,
};

/// Creates a new OpenAI-compatible API client from configuration.
///
/// # Errors
/// [`NutshellError::Configuration`] when no API key is configured.
fn create_client(config: &NutshellConfig) -> Result<Client<OpenAIConfig>> {
    let openai_config = OpenAIConfig::new()
        .with_api_key(config.require_api_key()?)
        .with_api_base(config.api_base.trim_end_matches('/'));
    debug!("Client created for {}", config.api_base);
    Ok(Client::with_config(openai_config))
}

fn user_message(text: &str) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
        content: ChatCompletionRequestUserMessageContent::Text(text.to_string()),
        name: None,
    })
}

/// Ask `model` (or the configured default) a question about `file_text`.
///
/// # Errors
/// - [`NutshellError::Configuration`] when no API key is configured.
/// - [`NutshellError::Upstream`] when the request fails or the reply is empty.
pub async fn generate_answer(
    config: &NutshellConfig,
    model: Option<&str>,
    file_text: &str,
    query: &str,
) -> Result<String> {
    let client = create_client(config)?;
    let model = model.unwrap_or(config.model.as_str());

    let request = CreateChatCompletionRequestArgs::default()
        .model(model)
        .messages(vec![user_message(file_text), user_message(query)])
        .build()
        .map_err(|e| NutshellError::upstream(format!("invalid request: {e}")))?;

    debug!(model, "Sending chat completion request");

    let response = client
        .chat()
        .create(request)
        .await
        .map_err(|e| NutshellError::upstream(format!("answer generation failed: {e}")))?;

    let mut response_string = String::new();
    response.choices.iter().for_each(|chat_choice| {
        if let Some(message_text) = &chat_choice.message.content {
            response_string.push_str(message_text);
        }
    });

    if response_string.is_empty() {
        return Err(NutshellError::upstream("answer service returned an empty response"));
    }

    Ok(response_string)
}

/// Generate an answer about `file_text` and log the exchange under `post_name`.
///
/// The logged context is the file text immediately followed by the query.
pub async fn ask_about_text(
    config: &NutshellConfig,
    log: &InteractionLog,
    post_name: &str,
    file_text: &str,
    query: &str,
    model: Option<&str>,
) -> Result<String> {
    let answer = generate_answer(config, model, file_text, query).await?;
    let full_context = format!("{file_text}{query}");
    log.log(post_name, query, &full_context, &answer)?;
    Ok(answer)
}

/// Read `file`, ask about it, log the exchange and return the answer.
///
/// # Errors
/// [`NutshellError::FileSystem`] when the file cannot be read; nothing is
/// logged in that case.
pub async fn query_file(
    config: &NutshellConfig,
    file: &Path,
    query: &str,
    model: Option<&str>,
) -> Result<String> {
    let file_text = fs::read_to_string(file).map_err(|e| NutshellError::file_system(file, e))?;
    let post_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let log = InteractionLog::from_config(config);
    ask_about_text(config, &log, &post_name, &file_text, query, model).await
}
