//! Dynamic library loading for native extensions
//!
//! Cross-platform support for opening shared libraries (.so, .dylib, .dll)
//! and looking up symbols in them. Libraries are opened with lazy binding
//! and global symbol visibility so that one extension can link against
//! symbols exported by another. Handles are never closed: init functions
//! may register callbacks that point into the library.

use std::ffi::{c_void, CStr, CString};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during dynamic linking
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// Library could not be opened; carries the platform diagnostic
    #[error("{message}")]
    Open {
        /// Path that was attempted
        path: String,
        /// Message from `dlerror` / `GetLastError`
        message: String,
    },

    /// Path or symbol name contains an interior NUL byte
    #[error("Invalid name: {0:?}")]
    InvalidName(String),
}

/// Cross-platform dynamic library handle
#[derive(Debug)]
pub struct Library {
    handle: LibraryHandle,
    path: String,
}

impl Library {
    /// Open a dynamic library.
    ///
    /// # Platform-specific behavior
    ///
    /// - **Unix**: `dlopen(RTLD_LAZY | RTLD_GLOBAL)`, diagnostic from `dlerror`
    /// - **Windows**: `LoadLibraryW`, diagnostic from `GetLastError`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LinkError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy().into_owned();
        let handle = LibraryHandle::load(path_ref, &path_str)?;
        Ok(Library {
            handle,
            path: path_str,
        })
    }

    /// Look up a symbol's address, `None` when the library does not export it.
    pub fn symbol(&self, name: &str) -> Result<Option<*mut c_void>, LinkError> {
        let c_name = CString::new(name).map_err(|_| LinkError::InvalidName(name.to_string()))?;
        Ok(self.handle.symbol(&c_name))
    }

    /// Get the path this library was opened from
    pub fn path(&self) -> &str {
        &self.path
    }
}

// Platform-specific implementations

#[cfg(unix)]
type LibraryHandle = UnixLibrary;

#[cfg(windows)]
type LibraryHandle = WindowsLibrary;

// ============================================================================
// Unix Implementation (Linux, macOS, BSD)
// ============================================================================

#[cfg(unix)]
#[derive(Debug)]
struct UnixLibrary {
    handle: *mut c_void,
}

#[cfg(unix)]
impl UnixLibrary {
    fn load(path: &Path, display: &str) -> Result<Self, LinkError> {
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| LinkError::InvalidName(display.to_string()))?;

        let handle = unsafe {
            // RTLD_LAZY: resolve functions on first call
            // RTLD_GLOBAL: exported symbols visible to libraries opened later
            libc::dlopen(c_path.as_ptr(), libc::RTLD_LAZY | libc::RTLD_GLOBAL)
        };

        if handle.is_null() {
            let message = unsafe {
                let err_ptr = libc::dlerror();
                if err_ptr.is_null() {
                    format!("{}: cannot open shared object", display)
                } else {
                    CStr::from_ptr(err_ptr).to_string_lossy().into_owned()
                }
            };
            return Err(LinkError::Open {
                path: display.to_string(),
                message,
            });
        }

        Ok(UnixLibrary { handle })
    }

    fn symbol(&self, name: &CStr) -> Option<*mut c_void> {
        unsafe {
            // Clear any previous error
            libc::dlerror();
            let symbol = libc::dlsym(self.handle, name.as_ptr());
            if symbol.is_null() {
                None
            } else {
                Some(symbol)
            }
        }
    }
}

// ============================================================================
// Windows Implementation
// ============================================================================

#[cfg(windows)]
#[derive(Debug)]
struct WindowsLibrary {
    handle: *mut c_void,
}

#[cfg(windows)]
impl WindowsLibrary {
    fn load(path: &Path, display: &str) -> Result<Self, LinkError> {
        use std::os::windows::ffi::OsStrExt;

        // Convert to wide string
        let wide: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        let handle = unsafe { LoadLibraryW(wide.as_ptr()) };

        if handle.is_null() {
            let code = unsafe { GetLastError() };
            return Err(LinkError::Open {
                path: display.to_string(),
                message: format!("{}: LoadLibrary failed (error code: {})", display, code),
            });
        }

        Ok(WindowsLibrary { handle })
    }

    fn symbol(&self, name: &CStr) -> Option<*mut c_void> {
        let symbol = unsafe { GetProcAddress(self.handle, name.as_ptr()) };
        if symbol.is_null() {
            None
        } else {
            Some(symbol)
        }
    }
}

// Windows FFI declarations
#[cfg(windows)]
extern "system" {
    fn LoadLibraryW(filename: *const u16) -> *mut c_void;
    fn GetProcAddress(module: *mut c_void, procname: *const std::ffi::c_char) -> *mut c_void;
    fn GetLastError() -> u32;
}
