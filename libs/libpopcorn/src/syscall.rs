//! Raw syscall interface
//!
//! This module provides the low-level syscall primitives for the Popcorn
//! facility. Most users should go through a [`Facility`](crate::Facility).
//!
//! The wrappers follow the kernel convention: a failed call returns
//! `-errno`, so the result can go straight to [`Error::from_raw`].

/// Perform a syscall with 1 argument
///
/// # Safety
/// `arg0` must be valid for whatever the kernel does with it for `num`.
#[inline]
pub unsafe fn syscall1(num: i64, arg0: u64) -> i64 {
    kernel_result(libc::syscall(num as libc::c_long, arg0))
}

/// Perform a syscall with 2 arguments
///
/// # Safety
/// Both arguments must be valid for whatever the kernel does with them for `num`.
#[inline]
pub unsafe fn syscall2(num: i64, arg0: u64, arg1: u64) -> i64 {
    kernel_result(libc::syscall(num as libc::c_long, arg0, arg1))
}

/// libc reports failure as `-1` with `errno` set; fold that back into `-errno`
fn kernel_result(ret: libc::c_long) -> i64 {
    if ret != -1 {
        return ret as i64;
    }
    let errno = std::io::Error::last_os_error()
        .raw_os_error()
        .unwrap_or(libc::ENOSYS);
    -(errno as i64)
}

/// Popcorn system call numbers
///
/// These MUST match the Popcorn kernel's syscall tables. Any mismatch will
/// cause undefined behavior at runtime.
///
/// The table is the full Popcorn ABI. `POPCORN_MIGRATE` and
/// `POPCORN_PROPOSE_MIGRATION` are not issued directly: migration needs the
/// register capture done by the runtime's `migrate()`, which makes these
/// calls itself.
#[cfg(target_arch = "x86_64")]
pub mod nr {
    /// Migrate the calling thread
    /// Args: nid, regs_ptr
    pub const POPCORN_MIGRATE: i64 = 330;

    /// Propose a migration destination for a thread
    /// Args: tid, nid
    pub const POPCORN_PROPOSE_MIGRATION: i64 = 331;

    /// Get the calling thread's placement
    /// Args: status_ptr
    pub const POPCORN_GET_THREAD_STATUS: i64 = 332;

    /// Get the status of every node
    /// Args: current_nid_ptr, info_ptr
    pub const POPCORN_GET_NODE_INFO: i64 = 333;
}

/// Popcorn system call numbers
///
/// These MUST match the Popcorn kernel's syscall tables. Any mismatch will
/// cause undefined behavior at runtime.
///
/// The table is the full Popcorn ABI. `POPCORN_MIGRATE` and
/// `POPCORN_PROPOSE_MIGRATION` are not issued directly: migration needs the
/// register capture done by the runtime's `migrate()`, which makes these
/// calls itself.
#[cfg(target_arch = "aarch64")]
pub mod nr {
    /// Migrate the calling thread
    /// Args: nid, regs_ptr
    pub const POPCORN_MIGRATE: i64 = 285;

    /// Propose a migration destination for a thread
    /// Args: tid, nid
    pub const POPCORN_PROPOSE_MIGRATION: i64 = 286;

    /// Get the calling thread's placement
    /// Args: status_ptr
    pub const POPCORN_GET_THREAD_STATUS: i64 = 287;

    /// Get the status of every node
    /// Args: current_nid_ptr, info_ptr
    pub const POPCORN_GET_NODE_INFO: i64 = 288;
}

/// Kernel error codes as returned by the facility (negative errno)
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// Success (not an error)
    Success = 0,
    /// Operation not permitted
    PermissionDenied = -1,
    /// No such process or thread
    NoSuchProcess = -3,
    /// Resource temporarily unavailable (node offline)
    Again = -11,
    /// Out of memory
    OutOfMemory = -12,
    /// Bad memory address
    BadAddress = -14,
    /// Resource busy (already at destination)
    Busy = -16,
    /// Invalid argument
    InvalidArgument = -22,
    /// Facility not present in this kernel
    NotImplemented = -38,
}

impl Error {
    /// Convert from raw syscall return value
    pub fn from_raw(value: i64) -> Result<u64, Self> {
        if value >= 0 {
            Ok(value as u64)
        } else {
            Err(match value as i32 {
                -1 => Self::PermissionDenied,
                -3 => Self::NoSuchProcess,
                -11 => Self::Again,
                -12 => Self::OutOfMemory,
                -14 => Self::BadAddress,
                -16 => Self::Busy,
                -22 => Self::InvalidArgument,
                _ => Self::NotImplemented, // Unknown error
            })
        }
    }

    /// Convert from a libc-style `-1` return plus `errno`
    pub fn from_errno(errno: i32) -> Self {
        match Self::from_raw(-(errno as i64)) {
            Ok(_) => Self::Success,
            Err(e) => e,
        }
    }

    /// Raw (negative) error code
    pub const fn code(&self) -> i32 {
        *self as i32
    }

    /// Get human-readable error message
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::PermissionDenied => "operation not permitted",
            Self::NoSuchProcess => "no such thread",
            Self::Again => "node temporarily unavailable",
            Self::OutOfMemory => "out of memory",
            Self::BadAddress => "bad memory address",
            Self::Busy => "resource busy",
            Self::InvalidArgument => "invalid argument",
            Self::NotImplemented => "facility not implemented",
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::error::Error for Error {}
