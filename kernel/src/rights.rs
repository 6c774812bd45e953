//! Capability rights: a composable bit set over `{Read, Write, Exec}`.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// A bit set over `{Read, Write, Exec}`. Composable by bitwise-or, exactly
/// as §3 specifies. Hand-rolled rather than pulled from a `bitflags`-style
/// crate: the teacher's workspace doesn't carry one, and three named bits
/// don't earn a new dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rights(u8);

impl Rights {
    pub const NONE: Rights = Rights(0);
    pub const READ: Rights = Rights(0b001);
    pub const WRITE: Rights = Rights(0b010);
    pub const EXEC: Rights = Rights(0b100);
    pub const RWX: Rights = Rights(0b111);

    /// True iff `self` contains every bit set in `required`.
    pub const fn contains(self, required: Rights) -> bool {
        self.0 & required.0 == required.0
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Rights {
    type Output = Rights;
    fn bitor(self, rhs: Self) -> Self::Output {
        Rights(self.0 | rhs.0)
    }
}

impl BitOrAssign for Rights {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Rights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.contains(Rights::READ) {
            parts.push("r");
        }
        if self.contains(Rights::WRITE) {
            parts.push("w");
        }
        if self.contains(Rights::EXEC) {
            parts.push("x");
        }
        if parts.is_empty() {
            write!(f, "-")
        } else {
            write!(f, "{}", parts.join(""))
        }
    }
}
