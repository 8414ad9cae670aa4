use std::{error::Error as StdError, fmt, num::NonZeroUsize, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

/// Opaque failure cause produced by a renderer. Nothing is assumed about its shape.
pub type RenderCause = Box<dyn StdError + Send + Sync + 'static>;

/// Pull-based chunk handle returned once the shell has been produced.
///
/// Each successful pull yields one chunk; `None` marks the end of the document.
pub type ChunkStream = BoxStream<'static, Result<Bytes, RenderCause>>;

/// Callback a renderer invokes for failures that happen after its shell resolved.
#[derive(Clone)]
pub struct ErrorReporter {
    callback: Arc<dyn Fn(RenderCause) + Send + Sync>,
}

impl ErrorReporter {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(RenderCause) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    pub fn report(&self, cause: RenderCause) {
        (self.callback)(cause);
    }
}

impl fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorReporter(..)")
    }
}

/// Options forwarded to the renderer untouched, except for `on_error`.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Prefix applied to element identifiers generated by the renderer.
    pub identifier_prefix: Option<String>,
    /// Classic scripts the client loads to hydrate the document.
    pub bootstrap_scripts: Vec<String>,
    /// Module scripts the client loads to hydrate the document.
    pub bootstrap_modules: Vec<String>,
    /// Inline script emitted alongside the bootstrap tags.
    pub bootstrap_script_content: Option<String>,
    /// Nonce attached to every emitted script tag.
    pub nonce: Option<String>,
    /// Upper bound on the size of a single emitted chunk.
    pub progressive_chunk_size: Option<NonZeroUsize>,
    /// Reserved. `stream_node` always installs its own reporter here; a caller
    /// supplied value never reaches the renderer.
    pub on_error: Option<ErrorReporter>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identifier_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.identifier_prefix = Some(prefix.into());
        self
    }

    pub fn with_bootstrap_scripts<I, S>(mut self, scripts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bootstrap_scripts = scripts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_bootstrap_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bootstrap_modules = modules.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_bootstrap_script_content(mut self, content: impl Into<String>) -> Self {
        self.bootstrap_script_content = Some(content.into());
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_progressive_chunk_size(mut self, size: NonZeroUsize) -> Self {
        self.progressive_chunk_size = Some(size);
        self
    }

    pub fn with_on_error(mut self, reporter: ErrorReporter) -> Self {
        self.on_error = Some(reporter);
        self
    }

    /// Forward a post-shell failure to the installed reporter, if any.
    pub fn report_error(&self, cause: RenderCause) {
        if let Some(reporter) = self.on_error.as_ref() {
            reporter.report(cause);
        }
    }
}

/// A document tree paired with the options it is rendered with.
#[derive(Debug)]
pub struct RenderRequest<N> {
    pub node: N,
    pub options: RenderOptions,
}

impl<N> RenderRequest<N> {
    pub fn new(node: N, options: RenderOptions) -> Self {
        Self { node, options }
    }
}

/// External streaming renderer.
///
/// `render` resolves once the shell is ready. An `Err` means no bytes exist yet;
/// failures after that point surface as `Err` items of the returned stream or
/// through `RenderOptions::report_error`.
#[async_trait]
pub trait Renderer: Send + Sync {
    type Node: Send + 'static;

    async fn render(
        &self,
        node: Self::Node,
        options: RenderOptions,
    ) -> Result<ChunkStream, RenderCause>;
}
