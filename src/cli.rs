use std::{net::IpAddr, path::PathBuf};

use crate::config::{DEFAULT_ENTRY_DOCUMENT, DEFAULT_HOST, DEFAULT_PORT_END, DEFAULT_PORT_START};

/// Serve the schema validator web app locally and open it in a browser.
///
/// Run without arguments to serve the bundled `webapp/` directory on the
/// first free port between 8000 and 8009.
#[derive(Debug, clap::Parser)]
#[command(version)]
pub struct Cli {
    /// Directory to serve. Defaults to the `webapp/` directory shipped with
    /// this crate, regardless of the current directory.
    #[arg(long)]
    pub root: Option<PathBuf>,
    /// First port to try.
    #[arg(long, default_value_t = DEFAULT_PORT_START)]
    pub port_start: u16,
    /// Last port to try before giving up.
    #[arg(long, default_value_t = DEFAULT_PORT_END)]
    pub port_end: u16,
    /// Allow any origin to fetch from this server.
    #[arg(long)]
    pub cors: bool,
    /// Don't open a browser once the server is up.
    #[arg(long)]
    pub no_browser: bool,
    /// Document served for directory requests and opened in the browser.
    #[arg(long, default_value = DEFAULT_ENTRY_DOCUMENT)]
    pub entry: String,
    /// Address to listen on.
    #[arg(long, default_value_t = DEFAULT_HOST)]
    pub host: IpAddr,
}
