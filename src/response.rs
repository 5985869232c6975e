use std::{
    fs::File,
    io::{self, Write},
    time::SystemTime,
};

use bytes::Bytes;

use crate::status::{Redirect, Status, Success};

/// A header field appended to every response by the server, e.g. `Date`.
pub type HeaderField<'a> = (&'a str, &'a str);

pub struct ErrResponse {
    pub status: Status,
    pub msg: Option<String>,
}

impl ErrResponse {
    pub fn from_status(status: Status) -> Self {
        Self { status, msg: None }
    }

    fn body(&self) -> Bytes {
        let code = self.status.code().as_u16();
        let msg = html_escape(self.msg.as_deref().unwrap_or(self.status.reason()));
        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>Error response</title>\n</head>\n<body>\n<h1>Error response</h1>\n\
             <p>Error code: {code}</p>\n<p>Message: {msg}</p>\n</body>\n</html>\n"
        )
        .into()
    }
}

/// An in-memory body, e.g. a directory listing.
pub struct SuccessResponse {
    pub status: Success,
    pub mime: String,
    pub body: Bytes,
}

/// A file streamed from disk.
pub struct FileResponse {
    pub mime: &'static str,
    pub file: File,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

pub enum Response {
    Err(ErrResponse),
    Fixed(SuccessResponse),
    Disk(FileResponse),
    /// Send the client to `location` for good.
    Moved(String),
    /// The client's cached copy is current.
    NotModified(Option<SystemTime>),
}

impl Response {
    pub fn not_found() -> Self {
        Response::Err(ErrResponse::from_status(Status::NOT_FOUND))
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Err(resp) => resp.status,
            Self::Fixed(resp) => Status::Success(resp.status),
            Self::Disk(_) => Status::OK,
            Self::Moved(_) => Status::Redirect(Redirect::MovedPermanently),
            Self::NotModified(_) => Status::Redirect(Redirect::NotModified),
        }
    }

    /// Send this response, with `extra` headers after our own.
    ///
    /// With `head_only` the headers describe the body but the body itself
    /// is withheld.
    pub fn send<W: Write>(
        self,
        mut writer: W,
        extra: &[HeaderField<'_>],
        head_only: bool,
    ) -> io::Result<()> {
        write!(writer, "HTTP/1.1 {}\r\n", self.status())?;
        match self {
            Self::Err(resp) => {
                let body = resp.body();
                write_entity_headers(&mut writer, "text/html; charset=utf-8", body.len() as u64)?;
                finish_head(&mut writer, extra)?;
                if !head_only {
                    writer.write_all(&body)?;
                }
            }
            Self::Fixed(SuccessResponse { mime, body, .. }) => {
                write_entity_headers(&mut writer, &mime, body.len() as u64)?;
                finish_head(&mut writer, extra)?;
                if !head_only {
                    writer.write_all(&body)?;
                }
            }
            Self::Disk(FileResponse {
                mime,
                mut file,
                len,
                modified,
            }) => {
                write_entity_headers(&mut writer, mime, len)?;
                write_last_modified(&mut writer, modified)?;
                finish_head(&mut writer, extra)?;
                if !head_only {
                    io::copy(&mut file, &mut writer)?;
                }
            }
            Self::Moved(location) => {
                write!(writer, "Location: {location}\r\n")?;
                write!(writer, "Content-Length: 0\r\n")?;
                finish_head(&mut writer, extra)?;
            }
            Self::NotModified(modified) => {
                write_last_modified(&mut writer, modified)?;
                finish_head(&mut writer, extra)?;
            }
        }
        writer.flush()
    }
}

fn write_entity_headers<W: Write>(writer: &mut W, mime: &str, len: u64) -> io::Result<()> {
    write!(writer, "Content-Type: {mime}\r\nContent-Length: {len}\r\n")
}

fn write_last_modified<W: Write>(writer: &mut W, modified: Option<SystemTime>) -> io::Result<()> {
    match modified {
        Some(time) => write!(writer, "Last-Modified: {}\r\n", httpdate::fmt_http_date(time)),
        None => Ok(()),
    }
}

fn finish_head<W: Write>(writer: &mut W, extra: &[HeaderField<'_>]) -> io::Result<()> {
    for (name, value) in extra {
        write!(writer, "{name}: {value}\r\n")?;
    }
    write!(writer, "Connection: close\r\n\r\n")
}

pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
