//! Ties port selection, the static responder and the browser together.
//!
//! A launcher moves through `Idle → PortProbing → Bound → Serving → Stopped`
//! exactly once; probing may also end straight in `Stopped` when every port
//! in the range is taken.

use log::{debug, info};

use crate::{
    browser::{self, Browser, SystemBrowser},
    config::ServerConfig,
    error::LaunchError,
    handler::StaticHandler,
    port::select_port,
    server::{Server, ServerHandle, Shutdown},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchState {
    Idle,
    PortProbing,
    Bound,
    Serving,
    Stopped,
}

impl LaunchState {
    fn can_become(self, next: LaunchState) -> bool {
        use LaunchState::*;
        matches!(
            (self, next),
            (Idle, PortProbing)
                | (Idle, Stopped)
                | (PortProbing, Bound)
                | (PortProbing, Stopped)
                | (Bound, Serving)
                | (Bound, Stopped)
                | (Serving, Stopped)
        )
    }
}

#[derive(Debug)]
struct Lifecycle(LaunchState);

impl Lifecycle {
    fn advance(&mut self, to: LaunchState) -> Result<(), LaunchError> {
        if !self.0.can_become(to) {
            return Err(LaunchError::InvalidTransition { from: self.0, to });
        }
        debug!("Launcher {:?} -> {:?}", self.0, to);
        self.0 = to;
        Ok(())
    }

    /// Record a failure, then hand it back.
    fn fail(&mut self, err: LaunchError) -> LaunchError {
        debug!("Launcher {:?} -> Stopped: {err}", self.0);
        self.0 = LaunchState::Stopped;
        err
    }
}

pub struct Launcher {
    config: ServerConfig,
    shutdown: Shutdown,
    browser: Box<dyn Browser>,
    lifecycle: Lifecycle,
}

impl Launcher {
    pub fn new(config: ServerConfig, shutdown: Shutdown) -> Self {
        Self {
            config,
            shutdown,
            browser: Box::new(SystemBrowser),
            lifecycle: Lifecycle(LaunchState::Idle),
        }
    }

    pub fn with_browser(mut self, browser: impl Browser) -> Self {
        self.browser = Box::new(browser);
        self
    }

    /// Bind a port and get ready to serve, without blocking.
    pub fn start(mut self) -> Result<Launched, LaunchError> {
        let root = &self.config.root_directory;
        let handler = StaticHandler::new(root, self.config.entry_document.as_str())
            .map_err(|source| LaunchError::Root {
                path: root.clone(),
                source,
            })
            .map_err(|e| self.lifecycle.fail(e))?;

        self.lifecycle.advance(LaunchState::PortProbing)?;
        let (listener, port) = select_port(self.config.bind_host, self.config.port_range)
            .map_err(|e| self.lifecycle.fail(e))?;
        self.lifecycle.advance(LaunchState::Bound)?;

        let handle = ServerHandle::new(listener, port, self.shutdown.clone());
        let server = Server::new(handle, Box::new(handler), self.config.cors_enabled)
            .map_err(|e| self.lifecycle.fail(e.into()))?;

        announce(&self.config, port);
        if self.config.auto_open_browser {
            // detached; serving never waits on it
            browser::open_after(
                self.browser,
                self.config.entry_url(port),
                self.config.browser_delay,
            );
        }
        self.lifecycle.advance(LaunchState::Serving)?;

        Ok(Launched {
            server,
            lifecycle: self.lifecycle,
        })
    }

    /// Start, then serve until shutdown is requested.
    pub fn run(self) -> Result<(), LaunchError> {
        self.start()?.serve()
    }
}

/// A launcher with a bound port, about to serve.
pub struct Launched {
    server: Server,
    lifecycle: Lifecycle,
}

impl Launched {
    pub fn port(&self) -> u16 {
        self.server.bound_port()
    }

    #[cfg(test)]
    pub fn state(&self) -> LaunchState {
        self.lifecycle.0
    }

    /// Block serving requests. The port is released before this returns.
    pub fn serve(mut self) -> Result<(), LaunchError> {
        let result = self.server.run();
        self.lifecycle.advance(LaunchState::Stopped)?;
        match result {
            Ok(()) => {
                println!();
                println!("Server stopped by user");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn announce(config: &ServerConfig, port: u16) {
    let rule = "=".repeat(60);
    println!("Schema Validator dev server");
    println!("Serving files from: {}", config.root_directory.display());
    println!("Server running at: {}", config.base_url(port));
    println!("Open: {}", config.entry_url(port));
    if config.cors_enabled {
        println!("CORS: any origin allowed");
    }
    println!("Press Ctrl+C to stop the server");
    println!("{rule}");
    info!(
        "Bound port {port} of {} on {}",
        config.port_range, config.bind_host
    );
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        browser::test::{Recording, Unavailable},
        config::PortRange,
        port::test::{HOST, occupied_run},
        server::test::get,
    };
    use anyhow::{Context, Result};
    use rstest::rstest;
    use std::{
        net::TcpListener,
        path::Path,
        sync::mpsc::{Receiver, channel},
        thread,
        time::{Duration, Instant},
    };
    use tempfile::TempDir;

    fn config(root: &Path, range: PortRange) -> ServerConfig {
        ServerConfig {
            root_directory: root.to_path_buf(),
            port_range: range,
            auto_open_browser: false,
            bind_host: HOST,
            browser_delay: Duration::ZERO,
            ..ServerConfig::default()
        }
    }

    fn webapp() -> Result<TempDir> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("index.html"), "<h1>Schema Validator</h1>")?;
        Ok(dir)
    }

    fn serve_in_background(launched: Launched) -> Receiver<Result<(), LaunchError>> {
        let (tx, rx) = channel();
        thread::spawn(move || {
            let _ = tx.send(launched.serve());
        });
        rx
    }

    #[rstest]
    #[case(LaunchState::Idle, LaunchState::PortProbing, true)]
    #[case(LaunchState::PortProbing, LaunchState::Bound, true)]
    #[case(LaunchState::PortProbing, LaunchState::Stopped, true)]
    #[case(LaunchState::Bound, LaunchState::Serving, true)]
    #[case(LaunchState::Serving, LaunchState::Stopped, true)]
    #[case(LaunchState::Idle, LaunchState::Serving, false)]
    #[case(LaunchState::Serving, LaunchState::Bound, false)]
    #[case(LaunchState::Stopped, LaunchState::Idle, false)]
    #[case(LaunchState::Stopped, LaunchState::Stopped, false)]
    fn transitions_follow_the_lifecycle(
        #[case] from: LaunchState,
        #[case] to: LaunchState,
        #[case] allowed: bool,
    ) {
        let mut lifecycle = Lifecycle(from);
        assert_eq!(lifecycle.advance(to).is_ok(), allowed);
        assert_eq!(lifecycle.0, if allowed { to } else { from });
    }

    #[test]
    fn starts_on_the_first_free_port_and_serves() -> Result<()> {
        let root = webapp()?;
        let (_held, start) = occupied_run(2)?;
        let range = PortRange::new(start, start + 2)?;
        let shutdown = Shutdown::default();

        let launched = Launcher::new(config(root.path(), range), shutdown.clone()).start()?;
        assert_eq!(launched.port(), start + 2);
        assert_eq!(launched.state(), LaunchState::Serving);

        let port = launched.port();
        let done = serve_in_background(launched);
        let resp = get(port, "/")?;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, "<h1>Schema Validator</h1>");

        shutdown.request();
        done.recv_timeout(Duration::from_secs(2))??;
        Ok(())
    }

    #[test]
    fn exhaustion_is_reported_without_binding_anything() -> Result<()> {
        let root = webapp()?;
        let (held, start) = occupied_run(2)?;
        let range = PortRange::new(start, start + 1)?;

        let err = Launcher::new(config(root.path(), range), Shutdown::default())
            .start()
            .err()
            .context("start should fail")?;
        assert!(matches!(err, LaunchError::PortExhaustion { .. }));

        drop(held);
        for port in range {
            TcpListener::bind((HOST, port))?;
        }
        Ok(())
    }

    #[test]
    fn a_missing_root_fails_before_probing() -> Result<()> {
        let root = webapp()?;
        let missing = root.path().join("nope");
        let (_, start) = occupied_run(0)?;
        let range = PortRange::new(start, start)?;

        let err = Launcher::new(config(&missing, range), Shutdown::default())
            .start()
            .err()
            .context("start should fail")?;
        assert!(matches!(err, LaunchError::Root { .. }));
        assert!(err.to_string().contains("nope"));

        TcpListener::bind((HOST, start)).context("port should be untouched")?;
        Ok(())
    }

    #[test]
    fn opens_the_entry_document_in_the_browser() -> Result<()> {
        let root = webapp()?;
        let (_, start) = occupied_run(0)?;
        let range = PortRange::new(start, start)?;
        let shutdown = Shutdown::default();
        let (tx, opened) = channel();

        let launched = Launcher::new(
            ServerConfig {
                auto_open_browser: true,
                ..config(root.path(), range)
            },
            shutdown.clone(),
        )
        .with_browser(Recording(tx))
        .start()?;
        let port = launched.port();
        let done = serve_in_background(launched);

        let url = opened.recv_timeout(Duration::from_secs(2))?;
        assert_eq!(url, format!("http://localhost:{port}/index.html"));

        shutdown.request();
        done.recv_timeout(Duration::from_secs(2))??;
        Ok(())
    }

    #[test]
    fn a_broken_browser_does_not_stop_the_server() -> Result<()> {
        let root = webapp()?;
        let (_, start) = occupied_run(0)?;
        let range = PortRange::new(start, start)?;
        let shutdown = Shutdown::default();

        let launched = Launcher::new(
            ServerConfig {
                auto_open_browser: true,
                ..config(root.path(), range)
            },
            shutdown.clone(),
        )
        .with_browser(Unavailable)
        .start()?;
        let port = launched.port();
        let done = serve_in_background(launched);

        thread::sleep(Duration::from_millis(100));
        assert_eq!(get(port, "/")?.status, 200);

        shutdown.request();
        done.recv_timeout(Duration::from_secs(2))??;
        Ok(())
    }

    #[test]
    fn an_interrupt_stops_serving_and_frees_the_port() -> Result<()> {
        let root = webapp()?;
        let (_, start) = occupied_run(0)?;
        let range = PortRange::new(start, start)?;
        let shutdown = Shutdown::default();

        let launched = Launcher::new(config(root.path(), range), shutdown.clone()).start()?;
        let port = launched.port();
        let done = serve_in_background(launched);
        assert_eq!(get(port, "/")?.status, 200);

        let interrupted = Instant::now();
        shutdown.request();
        done.recv_timeout(Duration::from_secs(2))??;
        assert!(interrupted.elapsed() < Duration::from_secs(2));

        TcpListener::bind((HOST, port)).context("port was not released")?;
        Ok(())
    }
}
