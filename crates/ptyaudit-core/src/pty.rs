//! PTY multiplexer device classification

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// File name of the device node that hands out fresh PTY masters
pub const MULTIPLEXER_NAME: &str = "ptmx";

/// Whether `path` names the multiplexer device
///
/// Only the final path component is compared, so `/dev/ptmx`, `/dev/pts/ptmx`
/// and a bare `ptmx` opened relative to a directory all match, while paths
/// that merely contain the sequence do not.
pub fn is_multiplexer_path(path: &[u8]) -> bool {
    Path::new(OsStr::from_bytes(path))
        .file_name()
        .is_some_and(|name| name.as_bytes() == MULTIPLEXER_NAME.as_bytes())
}
