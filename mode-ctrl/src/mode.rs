//! Permission bitmask handling
//!
//! A [`Mode`] carries the permission bits of a file (rwx for owner, group
//! and other, plus setuid, setgid and sticky). File-type bits reported by
//! `stat` are dropped on construction so that a captured mode can be handed
//! straight back to `chmod`.

use serde::{Serialize, Serializer};
use std::fmt;

/// Permission bits of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mode(u32);

impl Mode {
    /// All bits `chmod` understands
    pub const PERMISSION_MASK: u32 = 0o7777;

    /// Owner, group and other execute bits
    #[cfg(unix)]
    pub const EXEC_BITS: u32 = (libc::S_IXUSR | libc::S_IXGRP | libc::S_IXOTH) as u32;

    #[cfg(not(unix))]
    pub const EXEC_BITS: u32 = 0o111;

    /// Build a mode from a raw `st_mode`, discarding the file-type bits
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw & Self::PERMISSION_MASK)
    }

    /// Raw permission bits
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// This mode with every execute bit cleared and all other bits kept
    pub const fn restricted(self) -> Self {
        Self(self.0 & !Self::EXEC_BITS)
    }

    /// True if no execute bit is set
    pub const fn is_restricted(self) -> bool {
        self.0 & Self::EXEC_BITS == 0
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

impl Serialize for Mode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
