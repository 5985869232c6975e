use std::str::FromStr;

use url::Url;

use crate::status::{ClientError, ServerError, Status};

/// Upper bound on a request head, request line and headers included.
pub const MAX_HEAD_LEN: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    /// Like `Get`, but the body is withheld.
    Head,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
        })
    }
}

#[derive(Debug, PartialEq)]
pub struct Request {
    method: Method,
    url: Url,
    headers: Vec<(String, String)>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum RequestError {
    #[error("The request head exceeded 8 KiB.")]
    TooLong,
    #[error("A request head must be terminated by an empty line.")]
    UnterminatedHead,
    #[error("Malformed request line: `{0}`.")]
    MalformedRequestLine(String),
    #[error("Unsupported protocol version: `{0}`.")]
    UnsupportedVersion(String),
    #[error("Unsupported method: `{0}`.")]
    UnsupportedMethod(String),
    #[error("URI parse error: `{0:?}`.")]
    URIParseError(#[from] url::ParseError),
    #[error("Malformed header line: `{0}`.")]
    MalformedHeader(String),
}

impl From<&RequestError> for Status {
    fn from(value: &RequestError) -> Self {
        match value {
            RequestError::TooLong => Status::ClientError(ClientError::HeaderFieldsTooLarge),
            RequestError::UnsupportedMethod(_) => Status::ServerError(ServerError::NotImplemented),
            RequestError::UnsupportedVersion(_) => {
                Status::ServerError(ServerError::VersionNotSupported)
            }
            _ => Status::ClientError(ClientError::BadRequest),
        }
    }
}

impl Request {
    pub fn method(&self) -> Method {
        self.method
    }

    /// The request target, resolved against `http://localhost/`.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn parse_method(token: &str) -> Result<Method, RequestError> {
    match token {
        "GET" => Ok(Method::Get),
        "HEAD" => Ok(Method::Head),
        other => Err(RequestError::UnsupportedMethod(other.to_owned())),
    }
}

fn parse_target(target: &str) -> Result<Url, RequestError> {
    let mut url = if target.starts_with('/') {
        // a leading `//` would otherwise be read as an authority
        let path = target.trim_start_matches(['/', '\\']);
        Url::parse("http://localhost/")?.join(&format!("/{path}"))?
    } else {
        // absolute-form, as sent to proxies
        let url = Url::parse(target)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RequestError::MalformedRequestLine(target.to_owned()));
        }
        url
    };
    url.set_fragment(None);
    Ok(url)
}

impl FromStr for Request {
    type Err = RequestError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > MAX_HEAD_LEN {
            return Err(RequestError::TooLong);
        }
        if !(s.ends_with("\r\n\r\n") || s.ends_with("\n\n")) {
            return Err(RequestError::UnterminatedHead);
        }

        let mut lines = s.lines();
        let request_line = lines.next().unwrap_or_default();
        let mut parts = request_line.split(' ');
        let (Some(method), Some(target), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(RequestError::MalformedRequestLine(request_line.to_owned()));
        };
        if !version.starts_with("HTTP/") {
            return Err(RequestError::MalformedRequestLine(request_line.to_owned()));
        } else if !matches!(version, "HTTP/1.0" | "HTTP/1.1") {
            return Err(RequestError::UnsupportedVersion(version.to_owned()));
        }

        let method = parse_method(method)?;
        let url = parse_target(target)?;

        let headers = lines
            .take_while(|line| !line.is_empty())
            .map(|line| {
                line.split_once(':')
                    .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
                    .filter(|(k, _)| !k.is_empty())
                    .ok_or_else(|| RequestError::MalformedHeader(line.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Request {
            method,
            url,
            headers,
        })
    }
}
