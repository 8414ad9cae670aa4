use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};

use super::{error::AssemblyError, tail::TailStream};

/// Body sent when the renderer could not produce its shell.
pub const SHELL_ERROR_BODY: &str = "Server Shell Error";
/// Body sent when the adapter itself failed before a response existed.
pub const INTERNAL_ERROR_BODY: &str = "Internal Server Error";

const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// Caller-supplied response settings. Only honoured on the success path.
#[derive(Debug, Clone, Default)]
pub struct ResponseConfig {
    /// Status for a successful stream; defaults to 200.
    pub status: Option<u16>,
    /// Headers merged over `content-type: text/html`. Later entries win.
    pub headers: Vec<(String, String)>,
}

impl ResponseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug)]
pub enum ResponseBody {
    Stream(TailStream),
    Text(&'static str),
}

/// Response produced by `stream_node`, ready to hand to the transport.
#[derive(Debug)]
pub struct NodeResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
}

impl NodeResponse {
    pub(crate) fn streaming(
        config: &ResponseConfig,
        tail: TailStream,
    ) -> Result<Self, AssemblyError> {
        let status = match config.status {
            Some(code) => {
                StatusCode::from_u16(code).map_err(|_| AssemblyError::InvalidStatus(code))?
            }
            None => StatusCode::OK,
        };
        let headers = merge_headers(&config.headers)?;

        Ok(Self {
            status,
            headers,
            body: ResponseBody::Stream(tail),
        })
    }

    pub(crate) fn shell_error() -> Self {
        Self::fixed(SHELL_ERROR_BODY)
    }

    pub(crate) fn internal_error() -> Self {
        Self::fixed(INTERNAL_ERROR_BODY)
    }

    fn fixed(body: &'static str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            headers,
            body: ResponseBody::Text(body),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.body, ResponseBody::Stream(_))
    }

    pub fn into_body(self) -> ResponseBody {
        self.body
    }
}

impl IntoResponse for NodeResponse {
    fn into_response(self) -> Response {
        let body = match self.body {
            ResponseBody::Stream(tail) => Body::from_stream(tail),
            ResponseBody::Text(text) => Body::from(text),
        };
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

fn merge_headers(overrides: &[(String, String)]) -> Result<HeaderMap, AssemblyError> {
    let mut headers = HeaderMap::with_capacity(overrides.len() + 1);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    for (name, value) in overrides {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| AssemblyError::InvalidHeaderName { name: name.clone() })?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| AssemblyError::InvalidHeaderValue { name: name.clone() })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}
