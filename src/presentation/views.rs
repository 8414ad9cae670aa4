use askama::{Error as AskamaError, Template};
use thiserror::Error;

/// A template failed to render. `origin` names the call site.
#[derive(Debug, Error)]
#[error("template `{origin}` failed to render")]
pub struct TemplateRenderError {
    origin: &'static str,
    #[source]
    error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(origin: &'static str, error: AskamaError) -> Self {
        Self { origin, error }
    }
}

pub fn render_template<T: Template>(
    template: &T,
    origin: &'static str,
) -> Result<String, TemplateRenderError> {
    template
        .render()
        .map_err(|err| TemplateRenderError::new(origin, err))
}

/// Content of the application page shell.
#[derive(Debug, Clone)]
pub struct PageView {
    pub title: String,
    pub name: String,
    pub lead: String,
}

impl PageView {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            title: "Shellstream".to_string(),
            name: name.into(),
            lead: "This page is streamed from the server as it renders.".to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct ScriptTag {
    pub src: String,
    pub module: bool,
}

/// Opening half of the document, up to and including the page heading.
#[derive(Template)]
#[template(path = "page_shell.html")]
pub struct PageShellTemplate<'a> {
    pub view: &'a PageView,
    pub root_id: String,
}

/// Closing half of the document: bootstrap scripts and the end tags.
#[derive(Template)]
#[template(path = "page_close.html")]
pub struct PageCloseTemplate<'a> {
    pub scripts: &'a [ScriptTag],
    pub inline_script: &'a str,
    pub nonce: &'a str,
}

/// Wrapper emitted around a deferred section once it resolves.
#[derive(Template)]
#[template(path = "deferred_section.html")]
pub struct DeferredSectionTemplate<'a> {
    pub id: &'a str,
    pub html: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_contains_greeting_and_title() {
        let view = PageView::new("Alice");
        let html = render_template(
            &PageShellTemplate {
                view: &view,
                root_id: "app-root".to_string(),
            },
            "presentation::views::tests",
        )
        .expect("shell renders");

        assert!(html.contains("<title>Shellstream</title>"));
        assert!(html.contains("<h1>Hello, Alice!</h1>"));
        assert!(html.contains(r#"id="app-root""#));
        assert!(!html.contains("</body>"));
    }

    #[test]
    fn shell_escapes_the_name() {
        let view = PageView::new("<script>");
        let html = render_template(
            &PageShellTemplate {
                view: &view,
                root_id: "root".to_string(),
            },
            "presentation::views::tests",
        )
        .expect("shell renders");

        assert!(!html.contains("<script>"));
    }

    #[test]
    fn close_emits_scripts_with_nonce() {
        let scripts = vec![
            ScriptTag {
                src: "/main.js".to_string(),
                module: false,
            },
            ScriptTag {
                src: "/hydrate.mjs".to_string(),
                module: true,
            },
        ];
        let html = render_template(
            &PageCloseTemplate {
                scripts: &scripts,
                inline_script: "window.__READY__ = true;",
                nonce: "abc123",
            },
            "presentation::views::tests",
        )
        .expect("close renders");

        assert_eq!(html.matches("<script").count(), 3);
        assert_eq!(html.matches(r#"nonce="abc123""#).count(), 3);
        assert_eq!(html.matches(r#"type="module""#).count(), 1);
        assert!(html.contains("main.js"));
        assert!(html.contains("hydrate.mjs"));
        assert!(html.contains("window.__READY__ = true;"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn close_omits_empty_nonce_and_inline_script() {
        let html = render_template(
            &PageCloseTemplate {
                scripts: &[],
                inline_script: "",
                nonce: "",
            },
            "presentation::views::tests",
        )
        .expect("close renders");

        assert!(!html.contains("<script"));
        assert!(!html.contains("nonce"));
    }
}
