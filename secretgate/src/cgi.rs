//! CGI/1.1 adapter
//!
//! The web server passes request metadata in environment variables and the
//! body on stdin; the response goes to stdout as a `Status:` line, headers,
//! a blank line and the body.

use axum::{body::Body, response::Response};
use bytes::Bytes;
use http::{header, Method, Request};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Request metadata taken from the CGI environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CgiRequest {
    pub method: String,
    pub path_info: String,
    pub query_string: String,
    pub content_type: Option<String>,
    pub content_length: Option<usize>,
}

impl CgiRequest {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut request = Self::default();
        for (key, value) in vars {
            match key.as_ref() {
                "REQUEST_METHOD" => request.method = value.into(),
                "PATH_INFO" => request.path_info = value.into(),
                "QUERY_STRING" => request.query_string = value.into(),
                "CONTENT_TYPE" => {
                    request.content_type = Some(value.into()).filter(|v: &String| !v.is_empty());
                }
                "CONTENT_LENGTH" => request.content_length = value.into().trim().parse().ok(),
                _ => {}
            }
        }
        request
    }

    fn uri(&self) -> String {
        let path = if self.path_info.is_empty() {
            "/"
        } else {
            self.path_info.as_str()
        };
        if self.query_string.is_empty() {
            path.to_string()
        } else {
            format!("{}?{}", path, self.query_string)
        }
    }

    /// Read the body from `reader`, honouring CONTENT_LENGTH when set
    pub async fn read_body<R: AsyncRead + Unpin>(&self, mut reader: R) -> std::io::Result<Bytes> {
        let mut buf = Vec::new();
        match self.content_length {
            Some(length) => reader.take(length as u64).read_to_end(&mut buf).await?,
            None => reader.read_to_end(&mut buf).await?,
        };
        Ok(Bytes::from(buf))
    }

    pub fn into_request(self, body: Bytes) -> anyhow::Result<Request<Body>> {
        let method = if self.method.is_empty() {
            Method::POST
        } else {
            Method::from_bytes(self.method.as_bytes())?
        };

        let mut builder = Request::builder()
            .method(method)
            .uri(self.uri())
            .header(header::CONTENT_LENGTH, body.len());
        if let Some(content_type) = &self.content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        Ok(builder.body(Body::from(body))?)
    }
}

/// Write `response` in CGI form
pub async fn write_response<W: AsyncWrite + Unpin>(
    response: Response,
    writer: &mut W,
) -> anyhow::Result<()> {
    let (parts, body) = response.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await?;

    let mut head = format!(
        "Status: {} {}\r\n",
        parts.status.as_u16(),
        parts.status.canonical_reason().unwrap_or("")
    )
    .into_bytes();
    for (name, value) in &parts.headers {
        head.extend_from_slice(name.as_str().as_bytes());
        head.extend_from_slice(b": ");
        head.extend_from_slice(value.as_bytes());
        head.extend_from_slice(b"\r\n");
    }
    head.extend_from_slice(b"\r\n");

    writer.write_all(&head).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}
