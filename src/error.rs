use std::path::PathBuf;

use crate::{handler::StaticHandlerError, launcher::LaunchState};

/// Everything that can stop the launcher before or while it serves.
///
/// Conflicts on individual ports, browser failures and the operator's
/// interrupt are handled where they happen and never reach this type.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Could not find an available port in range {start}-{end}")]
    PortExhaustion { start: u16, end: u16 },
    #[error("Invalid port range {start}-{end}: start must not exceed end")]
    InvalidPortRange { start: u16, end: u16 },
    #[error("Cannot serve {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: StaticHandlerError,
    },
    #[error("Launcher cannot go from {from:?} to {to:?}")]
    InvalidTransition { from: LaunchState, to: LaunchState },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
