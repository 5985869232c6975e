use std::{
    net::{IpAddr, Ipv4Addr},
    ops::RangeInclusive,
    path::PathBuf,
    time::Duration,
};

use crate::{cli::Cli, error::LaunchError};

pub const DEFAULT_PORT_START: u16 = 8000;
pub const DEFAULT_PORT_END: u16 = 8009;
pub const DEFAULT_ENTRY_DOCUMENT: &str = "index.html";
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_BROWSER_DELAY: Duration = Duration::from_secs(1);

/// The served directory when none is given: `webapp/` beside this crate's
/// manifest, wherever the binary is invoked from.
pub fn default_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("webapp")
}

/// An inclusive, ascending range of candidate ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    start: u16,
    end: u16,
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> Result<Self, LaunchError> {
        if start > end {
            Err(LaunchError::InvalidPortRange { start, end })
        } else {
            Ok(Self { start, end })
        }
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            start: DEFAULT_PORT_START,
            end: DEFAULT_PORT_END,
        }
    }
}

impl IntoIterator for PortRange {
    type Item = u16;
    type IntoIter = RangeInclusive<u16>;

    fn into_iter(self) -> Self::IntoIter {
        self.start..=self.end
    }
}

impl std::fmt::Display for PortRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub root_directory: PathBuf,
    pub port_range: PortRange,
    pub cors_enabled: bool,
    pub auto_open_browser: bool,
    pub entry_document: String,
    pub bind_host: IpAddr,
    pub browser_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root_directory: default_root(),
            port_range: PortRange::default(),
            cors_enabled: false,
            auto_open_browser: true,
            entry_document: DEFAULT_ENTRY_DOCUMENT.into(),
            bind_host: DEFAULT_HOST,
            browser_delay: DEFAULT_BROWSER_DELAY,
        }
    }
}

impl ServerConfig {
    pub fn base_url(&self, port: u16) -> String {
        format!("http://localhost:{port}")
    }

    /// Where the browser is pointed once the server is up.
    pub fn entry_url(&self, port: u16) -> String {
        format!("{}/{}", self.base_url(port), self.entry_document)
    }
}

impl TryFrom<&Cli> for ServerConfig {
    type Error = LaunchError;
    fn try_from(cli: &Cli) -> Result<Self, Self::Error> {
        let root_directory = match &cli.root {
            Some(root) => std::path::absolute(root)?,
            None => default_root(),
        };
        Ok(Self {
            root_directory,
            port_range: PortRange::new(cli.port_start, cli.port_end)?,
            cors_enabled: cli.cors,
            auto_open_browser: !cli.no_browser,
            entry_document: cli.entry.clone(),
            bind_host: cli.host,
            browser_delay: DEFAULT_BROWSER_DELAY,
        })
    }
}
