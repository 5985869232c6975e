use std::{io, thread, time::Duration};

use log::{debug, info};

/// Something which can show a URL to the operator.
pub trait Browser: Send + 'static {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// The platform's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        open::that(url)
    }
}

/// Open `url` in `browser` after `delay`, on a detached thread.
///
/// A failure is logged and otherwise ignored. Nobody needs to join the
/// returned handle; the thread dies with the process.
pub fn open_after<B: Browser>(browser: B, url: String, delay: Duration) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        thread::sleep(delay);
        debug!("Opening {url}");
        match browser.open(&url) {
            Ok(()) => info!("Opened {url} in the default browser"),
            Err(e) => info!("Could not open a browser ({e}); please open {url} manually"),
        }
    })
}

impl<B: Browser + ?Sized> Browser for Box<B> {
    fn open(&self, url: &str) -> io::Result<()> {
        (**self).open(url)
    }
}
