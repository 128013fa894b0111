//! Locating input event nodes from the kernel device registry.
//!
//! `/proc/bus/input/devices` is a sequence of blank-line separated blocks.
//! The `N:` line carries the device name, the `H:` line lists handlers:
//!
//! ```text
//! N: Name="kbdsrv virtual keyboard"
//! H: Handlers=sysrq kbd event3
//! ```

use crate::error::FbError;
use std::path::{Path, PathBuf};

/// Event node number of the first device whose name line contains `name`.
///
/// The handler line is the first `H` line after the matching `N` line.
pub fn find_event_number(registry: &str, name: &str) -> Result<u32, FbError> {
    let mut found = false;
    for line in registry.lines() {
        if !found {
            found = line.starts_with('N') && line.contains(name);
            continue;
        }
        if line.starts_with('H') {
            return parse_handler_line(line)
                .ok_or_else(|| FbError::MissingEventHandler(name.to_string()));
        }
    }
    if found {
        Err(FbError::MissingEventHandler(name.to_string()))
    } else {
        Err(FbError::InputDeviceNotFound(name.to_string()))
    }
}

/// Number after the `event` token of a handler line
fn parse_handler_line(line: &str) -> Option<u32> {
    let (_, handlers) = line.split_once('=')?;
    handlers
        .split_whitespace()
        .find_map(|token| token.strip_prefix("event"))
        .and_then(|n| n.parse().ok())
}

/// `<dir>/event<n>`
pub fn event_node_path(dir: &Path, number: u32) -> PathBuf {
    dir.join(format!("event{}", number))
}

/// Read the registry at `path` and resolve `name` to its event node.
pub fn locate(registry_path: &Path, event_dir: &Path, name: &str) -> Result<PathBuf, FbError> {
    let text = std::fs::read_to_string(registry_path).map_err(|source| FbError::RegistryRead {
        path: registry_path.to_path_buf(),
        source,
    })?;
    let number = find_event_number(&text, name)?;
    Ok(event_node_path(event_dir, number))
}
