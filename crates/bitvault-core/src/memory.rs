//! Memory protection for sensitive data.
//!
//! Provides two hardening measures:
//!
//! 1. **Core dump prevention** — disables core dumps via
//!    `setrlimit(RLIMIT_CORE, 0)` so a crash never writes seed material to
//!    disk.
//! 2. **Memory locking** — locks a memory region via `mlock()` so the OS
//!    never swaps sensitive data (seeds, keys, PIN-derived AEAD keys) out
//!    to disk.
//!
//! Both are best-effort: failures are logged but never panic, since some
//! environments (containers, unprivileged users) don't permit these
//! operations.

use std::sync::atomic::{AtomicBool, Ordering};

static CORE_DUMPS_DISABLED: AtomicBool = AtomicBool::new(false);

/// Disable core dumps for the current process. Idempotent. Should be
/// called once, early, at daemon/application startup.
pub fn disable_core_dumps() -> bool {
    if CORE_DUMPS_DISABLED.swap(true, Ordering::SeqCst) {
        return true;
    }

    #[cfg(unix)]
    {
        unix::disable_core_dumps_impl()
    }

    #[cfg(not(unix))]
    {
        eprintln!("[bitvault] warning: core dump prevention not supported on this platform");
        false
    }
}

/// Lock a memory region so it is never swapped to disk.
///
/// # Safety
/// `ptr` must point to a valid allocation of at least `len` bytes that
/// outlives the lock, and must be unlocked via [`munlock`] before being
/// freed (or the process must exit, which implicitly unlocks all pages).
pub unsafe fn mlock(ptr: *const u8, len: usize) -> bool {
    if len == 0 {
        return true;
    }
    #[cfg(unix)]
    {
        unix::mlock_impl(ptr, len)
    }
    #[cfg(not(unix))]
    {
        let _ = (ptr, len);
        false
    }
}

/// Unlock a region previously locked with [`mlock`].
///
/// # Safety
/// `ptr` and `len` must match a prior `mlock` call.
pub unsafe fn munlock(ptr: *const u8, len: usize) -> bool {
    if len == 0 {
        return true;
    }
    #[cfg(unix)]
    {
        unix::munlock_impl(ptr, len)
    }
    #[cfg(not(unix))]
    {
        let _ = (ptr, len);
        true
    }
}

/// A byte buffer that is `mlock`ed on creation and zeroized + `munlock`ed
/// on drop. Use this for any seed, xprv, or WIF plaintext that must never
/// hit swap.
pub struct LockedBuffer {
    data: Vec<u8>,
    locked: bool,
}

impl LockedBuffer {
    pub fn new(len: usize) -> Self {
        let data = vec![0u8; len];
        let locked = if data.is_empty() {
            true
        } else {
            unsafe { mlock(data.as_ptr(), data.len()) }
        };
        Self { data, locked }
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut buf = Self::new(bytes.len());
        buf.as_mut_slice().copy_from_slice(bytes);
        buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Drop for LockedBuffer {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.data.zeroize();
        if self.locked && !self.data.is_empty() {
            unsafe {
                munlock(self.data.as_ptr(), self.data.len());
            }
        }
    }
}

#[cfg(unix)]
mod unix {
    pub fn disable_core_dumps_impl() -> bool {
        // SAFETY: setrlimit with RLIMIT_CORE=0 is a standard POSIX call.
        unsafe {
            let rlim = libc::rlimit {
                rlim_cur: 0,
                rlim_max: 0,
            };
            libc::setrlimit(libc::RLIMIT_CORE, &rlim) == 0
        }
    }

    pub unsafe fn mlock_impl(ptr: *const u8, len: usize) -> bool {
        libc::mlock(ptr as *const libc::c_void, len) == 0
    }

    pub unsafe fn munlock_impl(ptr: *const u8, len: usize) -> bool {
        libc::munlock(ptr as *const libc::c_void, len) == 0
    }
}
