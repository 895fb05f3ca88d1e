use alloc::string::String;
use core::fmt::{Display, Formatter, Result};
use core::str::FromStr;

/// Deadlock-prevention policy applied when a lock request conflicts.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    /// The requester always aborts.
    ImmediateRestart,
    /// A requester younger than the holder aborts, otherwise it waits.
    WaitDie,
    /// A requester younger than the holder waits, otherwise it aborts.
    ///
    /// The holder is never wounded: only the requester's fate is decided.
    WoundWait,
}

/// What happens to a requester whose lock request conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Wait,
    Restart,
}

impl Policy {
    pub const ALL: [Self; 3] = [Self::ImmediateRestart, Self::WaitDie, Self::WoundWait];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ImmediateRestart => "immediate-restart",
            Self::WaitDie => "wait-die",
            Self::WoundWait => "wound-wait",
        }
    }

    /// Decides the requester's fate. `holder_is_older` tells whether some
    /// holder of the requested page is strictly older than the requester.
    #[must_use]
    pub const fn resolve(self, holder_is_older: bool) -> Resolution {
        match (self, holder_is_older) {
            (Self::ImmediateRestart, _)
            | (Self::WaitDie, true)
            | (Self::WoundWait, false) => Resolution::Restart,
            (Self::WaitDie, false) | (Self::WoundWait, true) => Resolution::Wait,
        }
    }
}

impl Display for Policy {
    fn fmt(&self, f: &mut Formatter) -> Result {
        f.write_str(self.name())
    }
}

/// Error returned when a policy name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, ::derive_more::Display)]
#[display("unknown policy `{_0}` (expected immediate-restart, wait-die or wound-wait)")]
pub struct UnknownPolicy(pub String);

impl core::error::Error for UnknownPolicy {}

impl FromStr for Policy {
    type Err = UnknownPolicy;

    fn from_str(name: &str) -> core::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|policy| policy.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownPolicy(name.into()))
    }
}
