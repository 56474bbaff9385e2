//! Best-effort ownership adjustment for created storage paths.
//!
//! The recorder usually runs privileged while the app that consumes the
//! segments does not, so freshly created directories and files may need to
//! be handed over. Failures are logged and swallowed: losing ownership
//! metadata is better than losing telemetry.

use std::path::Path;

use tracing::warn;

/// Applied to the storage directory and each segment file right after
/// creation.
pub trait OwnershipHandler: Send {
    fn apply(&self, path: &Path);
}

/// Leaves ownership exactly as created. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOwnership;

impl OwnershipHandler for NoopOwnership {
    fn apply(&self, _path: &Path) {}
}

/// Reassigns created paths to a fixed uid/gid.
#[cfg(unix)]
#[derive(Debug, Clone, Copy)]
pub struct ChownOwnership {
    uid: u32,
    gid: u32,
}

#[cfg(unix)]
impl ChownOwnership {
    pub fn new(uid: u32, gid: u32) -> Self {
        ChownOwnership { uid, gid }
    }
}

#[cfg(unix)]
impl OwnershipHandler for ChownOwnership {
    fn apply(&self, path: &Path) {
        use std::os::unix::ffi::OsStrExt;

        let cpath = match std::ffi::CString::new(path.as_os_str().as_bytes()) {
            Ok(cpath) => cpath,
            Err(_) => return, // interior NUL cannot name a real path
        };
        // SAFETY: cpath is a valid NUL-terminated string for the call.
        let rc = unsafe { libc::chown(cpath.as_ptr(), self.uid, self.gid) };
        if rc != 0 {
            let error = std::io::Error::last_os_error();
            warn!(path = %path.display(), %error, "failed to change ownership");
        }
    }
}
