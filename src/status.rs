/// An HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(u16);

impl StatusCode {
    pub fn as_u16(self) -> u16 {
        self.0
    }
}

/// The request was fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Success {
    Ok,
}

/// The client should look somewhere else, or at what it already has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    MovedPermanently,
    NotModified,
}

/// The client asked for something we can't give it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientError {
    BadRequest,
    NotFound,
    RequestTimeout,
    /// The request head exceeded our buffer.
    HeaderFieldsTooLarge,
}

/// The server couldn't, or won't.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerError {
    NotImplemented,
    VersionNotSupported,
}

/// A status, according to its class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success(Success),
    Redirect(Redirect),
    ClientError(ClientError),
    ServerError(ServerError),
}

impl Status {
    pub const OK: Status = Status::Success(Success::Ok);
    pub const NOT_FOUND: Status = Status::ClientError(ClientError::NotFound);

    /// The reason phrase sent on the status line.
    #[rustfmt::skip]
    pub fn reason(&self) -> &'static str {
        match self {
            Status::Success(Success::Ok)                           => "OK",
            Status::Redirect(Redirect::MovedPermanently)           => "Moved Permanently",
            Status::Redirect(Redirect::NotModified)                => "Not Modified",
            Status::ClientError(ClientError::BadRequest)           => "Bad Request",
            Status::ClientError(ClientError::NotFound)             => "Not Found",
            Status::ClientError(ClientError::RequestTimeout)       => "Request Timeout",
            Status::ClientError(ClientError::HeaderFieldsTooLarge) => "Request Header Fields Too Large",
            Status::ServerError(ServerError::NotImplemented)       => "Not Implemented",
            Status::ServerError(ServerError::VersionNotSupported)  => "HTTP Version Not Supported",
        }
    }

    pub fn code(&self) -> StatusCode {
        StatusCode::from(self)
    }
}

#[rustfmt::skip]
impl From<&Status> for StatusCode {
    fn from(value: &Status) -> Self {
        match value {
            Status::Success(Success::Ok)                           => StatusCode(200),
            Status::Redirect(Redirect::MovedPermanently)           => StatusCode(301),
            Status::Redirect(Redirect::NotModified)                => StatusCode(304),
            Status::ClientError(ClientError::BadRequest)           => StatusCode(400),
            Status::ClientError(ClientError::NotFound)             => StatusCode(404),
            Status::ClientError(ClientError::RequestTimeout)       => StatusCode(408),
            Status::ClientError(ClientError::HeaderFieldsTooLarge) => StatusCode(431),
            Status::ServerError(ServerError::NotImplemented)       => StatusCode(501),
            Status::ServerError(ServerError::VersionNotSupported)  => StatusCode(505),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", StatusCode::from(self).0, self.reason())
    }
}
