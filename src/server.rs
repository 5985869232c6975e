use crate::{
    handler::Handler,
    request::{MAX_HEAD_LEN, Method, Request, RequestError},
    response::{ErrResponse, HeaderField, Response},
    status::*,
};
use std::{
    io::{self, BufRead, BufReader, Read},
    net::{SocketAddr, TcpListener, TcpStream},
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, SystemTime},
};

use log::{debug, info, warn};

pub const SERVER_NAME: &str = concat!("validator-serve/", env!("CARGO_PKG_VERSION"));

/// Sent on every response when CORS is enabled.
pub const CORS_HEADERS: [HeaderField<'static>; 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

/// How often the accept loop looks at the shutdown flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);
const IO_TIMEOUT: Duration = Duration::from_secs(5);
/// How long to wait for a client to finish sending a request we've refused.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO failed: `{0:?}`")]
    IO(#[from] io::Error),
    #[error("Invalid request: `{0:?}`")]
    Request(#[from] RequestError),
    #[error("Request not utf8: `{0:?}`")]
    Utf8(#[from] std::string::FromUtf8Error),
}

type Result<T> = std::result::Result<T, Error>;

/// Asks a running server to stop. Cloned into the interrupt handler.
#[derive(Debug, Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The bound listening socket. Dropping it releases the port.
#[derive(Debug)]
pub struct ServerHandle {
    listener: TcpListener,
    bound_port: u16,
    shutdown: Shutdown,
}

impl ServerHandle {
    pub fn new(listener: TcpListener, bound_port: u16, shutdown: Shutdown) -> Self {
        Self {
            listener,
            bound_port,
            shutdown,
        }
    }

    pub fn bound_port(&self) -> u16 {
        self.bound_port
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.is_requested()
    }
}

pub struct Server {
    handle: ServerHandle,
    responder: Arc<Responder>,
}

/// Shared by every connection thread.
struct Responder {
    handler: Box<dyn Handler + Send + Sync>,
    cors_enabled: bool,
}

fn read_raw_request<R: BufRead>(reader: R) -> Result<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut reader = reader.take(MAX_HEAD_LEN as u64 + 1);
    loop {
        let n = reader.read_until(b'\n', &mut buf)?;
        if buf.len() > MAX_HEAD_LEN {
            return Err(RequestError::TooLong.into());
        }
        if n == 0 || buf.ends_with(b"\r\n\r\n") || buf.ends_with(b"\n\n") {
            break;
        }
    }
    Ok(String::from_utf8(buf)?)
}

/// Discard what's left of a refused request so closing the socket doesn't
/// reset the connection under the client before it reads our answer.
fn drain(stream: &TcpStream) {
    let _ = stream.shutdown(std::net::Shutdown::Write);
    let _ = stream.set_read_timeout(Some(DRAIN_TIMEOUT));
    let _ = io::copy(&mut stream.take(64 * 1024), &mut io::sink());
}

impl Server {
    pub fn new(
        handle: ServerHandle,
        handler: Box<dyn Handler + Send + Sync>,
        cors_enabled: bool,
    ) -> io::Result<Self> {
        handle.listener.set_nonblocking(true)?;
        Ok(Self {
            handle,
            responder: Arc::new(Responder {
                handler,
                cors_enabled,
            }),
        })
    }

    pub fn bound_port(&self) -> u16 {
        self.handle.bound_port()
    }

    /// Accept connections until shutdown is requested, answering each on its
    /// own thread. The listening socket is released on return; connections
    /// still in flight finish or time out on their own.
    pub fn run(self) -> io::Result<()> {
        info!("Listening on {}", self.handle.listener.local_addr()?);
        while self.handle.is_running() {
            match self.handle.listener.accept() {
                Ok((stream, peer)) => {
                    let responder = Arc::clone(&self.responder);
                    let _ = thread::Builder::new()
                        .name(format!("conn-{peer}"))
                        .spawn(move || {
                            let _ = responder
                                .answer(stream, peer)
                                .inspect_err(|e| warn!("Failed to answer {peer}: {e}"));
                        })
                        .inspect_err(|e| warn!("No thread for {peer}: {e}"));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::Interrupted
                            | io::ErrorKind::ConnectionAborted
                            | io::ErrorKind::ConnectionReset
                    ) =>
                {
                    debug!("Accept interrupted: {e}");
                }
                Err(e) => return Err(e),
            }
        }
        info!("Shutdown requested, releasing port {}", self.handle.bound_port());
        Ok(())
    }
}

impl Responder {
    fn handle_request(&self, request: &str) -> Result<(Request, Response)> {
        let request = Request::from_str(request)?;
        let response = self
            .handler
            .handle_request(&request)
            .unwrap_or_else(Response::not_found);
        Ok((request, response))
    }

    fn answer(&self, stream: TcpStream, peer: SocketAddr) -> io::Result<()> {
        // accepted sockets inherit non-blocking mode on some platforms
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;

        let raw = match read_raw_request(BufReader::new(&stream)) {
            Ok(raw) if raw.is_empty() => {
                debug!("{peer} closed without sending a request");
                return Ok(());
            }
            other => other,
        };
        let outcome = raw.and_then(|raw| self.handle_request(&raw));
        let (line, head_only, resp, refused) = match outcome {
            Ok((request, resp)) => (
                format!("{} {}", request.method(), request.url().path()),
                request.method() == Method::Head,
                resp,
                false,
            ),
            Err(e) => {
                let resp = match e {
                    Error::IO(ref e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                        ) =>
                    {
                        ErrResponse::from_status(Status::ClientError(ClientError::RequestTimeout))
                    }
                    Error::IO(e) => {
                        debug!("{peer} read failed: {e}");
                        return Ok(());
                    }
                    Error::Utf8(ref e) => ErrResponse {
                        status: Status::ClientError(ClientError::BadRequest),
                        msg: Some(e.to_string()),
                    },
                    Error::Request(ref e) => ErrResponse {
                        status: e.into(),
                        msg: Some(e.to_string()),
                    },
                };
                ("-".to_owned(), false, Response::Err(resp), true)
            }
        };

        info!("{peer} \"{line}\" {}", resp.status().code().as_u16());
        let date = httpdate::fmt_http_date(SystemTime::now());
        let mut extra: Vec<HeaderField<'_>> =
            vec![("Server", SERVER_NAME), ("Date", date.as_str())];
        if self.cors_enabled {
            extra.extend_from_slice(&CORS_HEADERS);
        }
        resp.send(&stream, &extra, head_only)?;
        if refused {
            drain(&stream);
        }
        Ok(())
    }
}
