mod middleware;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    application::stream::{
        FailureSink, NodeResponse, RenderCause, RenderOptions, ResponseConfig, TracingSink,
        stream_node_with_sink,
    },
    config::PageSettings,
    infra::renderer::{DeferredSection, Page, TemplateRenderer},
    presentation::views::PageView,
};

pub use middleware::RequestContext;
use middleware::{log_responses, set_request_context};

const DEFERRED_SECTION_ID: &str = "deferred-greeting";

#[derive(Clone)]
pub struct HttpState {
    pub renderer: Arc<TemplateRenderer>,
    pub page: Arc<PageSettings>,
    pub sink: Arc<dyn FailureSink>,
}

impl HttpState {
    pub fn new(page: PageSettings) -> Self {
        Self {
            renderer: Arc::new(TemplateRenderer),
            page: Arc::new(page),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.sink = sink;
        self
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
        .with_state(state)
}

async fn index(State(state): State<HttpState>) -> Response {
    stream_application_page(&state).await.into_response()
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Stream the configured application page.
pub async fn stream_application_page(state: &HttpState) -> NodeResponse {
    let settings = state.page.as_ref();
    stream_node_with_sink(
        state.renderer.as_ref(),
        application_page(settings),
        render_options(settings),
        response_config(settings),
        Arc::clone(&state.sink),
    )
    .await
}

pub fn application_page(settings: &PageSettings) -> Page {
    let view = PageView::new(settings.name.clone()).with_title(settings.title.clone());
    let delay = settings.deferred_delay;
    Page::new(view).with_section(DeferredSection::new(
        DEFERRED_SECTION_ID,
        deferred_greeting(delay),
    ))
}

async fn deferred_greeting(delay: Duration) -> Result<String, RenderCause> {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    Ok(format!(
        "<p>Deferred content resolved after {} ms.</p>",
        delay.as_millis()
    ))
}

pub fn render_options(settings: &PageSettings) -> RenderOptions {
    let mut options = RenderOptions::new()
        .with_bootstrap_scripts(settings.bootstrap_scripts.iter().cloned())
        .with_bootstrap_modules(settings.bootstrap_modules.iter().cloned());
    if let Some(prefix) = settings.identifier_prefix.as_ref() {
        options = options.with_identifier_prefix(prefix.clone());
    }
    if let Some(content) = settings.bootstrap_script_content.as_ref() {
        options = options.with_bootstrap_script_content(content.clone());
    }
    if let Some(nonce) = settings.nonce.as_ref() {
        options = options.with_nonce(nonce.clone());
    }
    if let Some(size) = settings.progressive_chunk_size {
        options = options.with_progressive_chunk_size(size);
    }
    options
}

pub fn response_config(settings: &PageSettings) -> ResponseConfig {
    let mut config = ResponseConfig::new();
    if let Some(status) = settings.status {
        config = config.with_status(status);
    }
    for (name, value) in &settings.headers {
        config = config.with_header(name.clone(), value.clone());
    }
    config
}
