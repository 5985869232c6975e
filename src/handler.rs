use std::{
    fs::{self, File},
    path::{Component, Path, PathBuf},
    time::SystemTime,
};

use log::debug;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::{
    request::Request,
    response::{FileResponse, Response, SuccessResponse, html_escape},
    status::Success,
};

pub trait Handler {
    fn handle_request(&self, request: &Request) -> Option<Response>;
}

/// Characters escaped in directory listing links.
const LINK: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Maps request paths onto files below a root directory.
#[derive(Debug)]
pub struct StaticHandler {
    path: PathBuf,
    entry_document: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StaticHandlerError {
    #[error("Path is relative: {0}")]
    RelativePath(PathBuf),
    #[error("Path does not exist: {0}")]
    MissingPath(PathBuf),
    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),
}

impl StaticHandler {
    pub fn new(
        path: impl Into<PathBuf>,
        entry_document: impl Into<String>,
    ) -> Result<Self, StaticHandlerError> {
        let path: PathBuf = path.into();
        if !path.is_absolute() {
            Err(StaticHandlerError::RelativePath(path))
        } else if !path.exists() {
            Err(StaticHandlerError::MissingPath(path))
        } else if !path.is_dir() {
            Err(StaticHandlerError::NotADirectory(path))
        } else {
            Ok(Self {
                path,
                entry_document: entry_document.into(),
            })
        }
    }

    /// Translate a URL path into a path below the root.
    ///
    /// Segments which are empty, `.`, `..` or otherwise not a plain file
    /// name are dropped, so the result never leaves the root.
    fn translate(&self, url_path: &str) -> PathBuf {
        let decoded = percent_decode_str(url_path).decode_utf8_lossy();
        decoded
            .split('/')
            .filter(|segment| is_plain_name(segment))
            .fold(self.path.clone(), |path, segment| path.join(segment))
    }

    fn serve_file(&self, path: &Path, request: &Request) -> Response {
        let Ok(file) = File::open(path) else {
            return Response::not_found();
        };
        let Ok(metadata) = file.metadata() else {
            return Response::not_found();
        };
        let modified = metadata.modified().ok();

        if let (Some(modified), Some(since)) = (
            modified,
            request
                .header("if-modified-since")
                .and_then(|v| httpdate::parse_http_date(v).ok()),
        ) {
            if !is_newer(modified, since) {
                return Response::NotModified(Some(modified));
            }
        }

        Response::Disk(FileResponse {
            mime: mime_type(path),
            file,
            len: metadata.len(),
            modified,
        })
    }

    fn list_directory(&self, path: &Path, url_path: &str) -> Response {
        let Ok(entries) = fs::read_dir(path) else {
            return Response::not_found();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| {
                let mut name = entry.file_name().to_string_lossy().into_owned();
                if entry.path().is_dir() {
                    name.push('/');
                }
                name
            })
            .collect();
        names.sort_by_key(|name| name.to_lowercase());

        let title = html_escape(&percent_decode_str(url_path).decode_utf8_lossy());
        let mut body = format!(
            "<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>Directory listing for {title}</title>\n</head>\n<body>\n\
             <h1>Directory listing for {title}</h1>\n<hr>\n<ul>\n"
        );
        for name in names {
            let href = html_escape(&utf8_percent_encode(&name, LINK).to_string());
            body.push_str(&format!(
                "<li><a href=\"{href}\">{}</a></li>\n",
                html_escape(&name)
            ));
        }
        body.push_str("</ul>\n<hr>\n</body>\n</html>\n");

        Response::Fixed(SuccessResponse {
            status: Success::Ok,
            mime: "text/html; charset=utf-8".into(),
            body: body.into(),
        })
    }
}

fn is_plain_name(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !segment.contains('\\')
}

/// HTTP dates have whole-second precision.
fn is_newer(modified: SystemTime, since: SystemTime) -> bool {
    let secs = |t: SystemTime| {
        t.duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    };
    secs(modified) > secs(since)
}

fn mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json" | "map") => "application/json",
        Some("txt" | "md") => "text/plain; charset=utf-8",
        Some("xml") => "application/xml",
        Some("csv") => "text/csv; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("wasm") => "application/wasm",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

impl Handler for StaticHandler {
    fn handle_request(&self, request: &Request) -> Option<Response> {
        let url = request.url();
        let path = self.translate(url.path());
        if !path.starts_with(&self.path) {
            return Some(Response::not_found());
        }
        debug!("{} -> {}", url.path(), path.display());

        let trailing_slash = url.path().ends_with('/');
        let response = if path.is_dir() {
            if !trailing_slash {
                let location = match url.query() {
                    Some(query) => format!("{}/?{query}", url.path()),
                    None => format!("{}/", url.path()),
                };
                Response::Moved(location)
            } else {
                let entry = path.join(&self.entry_document);
                if entry.is_file() {
                    self.serve_file(&entry, request)
                } else {
                    self.list_directory(&path, url.path())
                }
            }
        } else if trailing_slash {
            Response::not_found()
        } else {
            self.serve_file(&path, request)
        };
        Some(response)
    }
}
