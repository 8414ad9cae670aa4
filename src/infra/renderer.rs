//! Reference [`Renderer`] backed by askama templates.
//!
//! A [`Page`] renders in two phases. The shell (document head, heading and
//! lead paragraph) is rendered before `render` resolves. Deferred sections are
//! awaited one at a time while the body streams; a failing section is reported
//! through `RenderOptions::report_error` and ends the document early.

use std::{fmt, num::NonZeroUsize};

use async_stream::stream;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{FutureExt, StreamExt, future::BoxFuture};

use crate::{
    application::stream::{ChunkStream, RenderCause, RenderOptions, Renderer},
    presentation::views::{
        DeferredSectionTemplate, PageCloseTemplate, PageShellTemplate, PageView, ScriptTag,
        render_template,
    },
};

const ROOT_ID: &str = "root";

/// Content of a section that resolves after the shell was sent.
pub type SectionFuture = BoxFuture<'static, Result<String, RenderCause>>;

pub struct DeferredSection {
    id: String,
    content: SectionFuture,
}

impl DeferredSection {
    pub fn new<F>(id: impl Into<String>, content: F) -> Self
    where
        F: Future<Output = Result<String, RenderCause>> + Send + 'static,
    {
        Self {
            id: id.into(),
            content: content.boxed(),
        }
    }

    pub fn ready(id: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        Self::new(id, async move { Ok(html) })
    }
}

impl fmt::Debug for DeferredSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredSection")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Document tree understood by [`TemplateRenderer`].
#[derive(Debug)]
pub struct Page {
    view: PageView,
    sections: Vec<DeferredSection>,
}

impl Page {
    pub fn new(view: PageView) -> Self {
        Self {
            view,
            sections: Vec::new(),
        }
    }

    pub fn with_section(mut self, section: DeferredSection) -> Self {
        self.sections.push(section);
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

#[async_trait]
impl Renderer for TemplateRenderer {
    type Node = Page;

    async fn render(
        &self,
        node: Page,
        options: RenderOptions,
    ) -> Result<ChunkStream, RenderCause> {
        let Page { view, sections } = node;
        let prefix = options.identifier_prefix.clone().unwrap_or_default();

        let shell = render_template(
            &PageShellTemplate {
                view: &view,
                root_id: format!("{prefix}{ROOT_ID}"),
            },
            "infra::renderer::shell",
        )?;

        let scripts = bootstrap_tags(&options);
        let closing = render_template(
            &PageCloseTemplate {
                scripts: &scripts,
                inline_script: options.bootstrap_script_content.as_deref().unwrap_or(""),
                nonce: options.nonce.as_deref().unwrap_or(""),
            },
            "infra::renderer::close",
        )?;

        let chunk_size = options.progressive_chunk_size;
        let body = stream! {
            for chunk in split_chunks(shell, chunk_size) {
                yield Ok(chunk);
            }

            let mut aborted = false;
            for section in sections {
                let id = format!("{prefix}{}", section.id);
                let resolved = match section.content.await {
                    Ok(html) => render_template(
                        &DeferredSectionTemplate { id: &id, html: &html },
                        "infra::renderer::section",
                    )
                    .map_err(RenderCause::from),
                    Err(cause) => Err(cause),
                };

                match resolved {
                    Ok(html) => {
                        for chunk in split_chunks(html, chunk_size) {
                            yield Ok(chunk);
                        }
                    }
                    Err(cause) => {
                        options.report_error(cause);
                        aborted = true;
                        break;
                    }
                }
            }

            if !aborted {
                for chunk in split_chunks(closing, chunk_size) {
                    yield Ok(chunk);
                }
            }
        };

        Ok(body.boxed())
    }
}

fn bootstrap_tags(options: &RenderOptions) -> Vec<ScriptTag> {
    let classic = options.bootstrap_scripts.iter().map(|src| ScriptTag {
        src: src.clone(),
        module: false,
    });
    let modules = options.bootstrap_modules.iter().map(|src| ScriptTag {
        src: src.clone(),
        module: true,
    });
    classic.chain(modules).collect()
}

fn split_chunks(html: String, limit: Option<NonZeroUsize>) -> Vec<Bytes> {
    let bytes = Bytes::from(html);
    let Some(limit) = limit else {
        return vec![bytes];
    };

    let mut chunks = Vec::with_capacity(bytes.len().div_ceil(limit.get()));
    let mut offset = 0;
    while offset < bytes.len() {
        let end = (offset + limit.get()).min(bytes.len());
        chunks.push(bytes.slice(offset..end));
        offset = end;
    }
    chunks
}
