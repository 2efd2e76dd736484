//! Status enums as the single source of truth for status strings.
//!
//! Every status that leaves the engine is one of these tagged variants. Raw
//! strings from storage are parsed exactly once, by the resolvers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for unrecognized status strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownStatus {
    kind: &'static str,
    value: String,
}

impl UnknownStatus {
    /// Returns the rejected raw value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Lowercases and folds spaces and dashes to underscores.
///
/// `"Not Cleared"`, `"not-cleared"` and `"NOT_CLEARED"` all normalize to
/// `"not_cleared"`.
fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Generates a status enum with canonical display strings and lenient parsing.
macro_rules! define_status {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $display:literal [$($alias:literal),+]
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Canonical display string.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $display,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownStatus;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match normalize(s).as_str() {
                    $($($alias)|+ => Ok(Self::$variant),)+
                    _ => Err(UnknownStatus {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

define_status!(
    /// Outcome of a single attempt as recorded by the grading collaborator.
    AttemptStatus, "attempt status" {
        Cleared => "Cleared" ["cleared", "passed", "pass"],
        NotCleared => "Not Cleared" ["not_cleared", "notcleared", "failed", "fail"],
        Ongoing => "Ongoing" ["ongoing", "in_progress", "pending"],
    }
);

define_status!(
    /// A subject's derived standing for one skill.
    SkillStatus, "skill status" {
        Cleared => "Cleared" ["cleared"],
        NotCleared => "Not Cleared" ["not_cleared", "notcleared"],
        Ongoing => "Ongoing" ["ongoing"],
        NotAttempted => "Not Attempted" ["not_attempted", "notattempted"],
    }
);

define_status!(
    /// A subject's recorded outcome for one attendance session.
    AttendanceState, "attendance state" {
        Present => "Present" ["present", "p"],
        Absent => "Absent" ["absent", "a"],
        Late => "Late" ["late", "l"],
        /// Excused absence backed by a permission slip.
        PermissionSlip => "PS" ["ps", "permission_slip", "permissionslip"],
    }
);

define_status!(
    /// Attendance at an attempt's proctoring slot. Only two outcomes exist.
    SlotAttendance, "slot attendance" {
        Present => "Present" ["present", "p"],
        Absent => "Absent" ["absent", "a"],
    }
);

define_status!(
    /// Where "now" falls relative to a session's scheduled window.
    SessionState, "session state" {
        NotStarted => "NotStarted" ["notstarted", "not_started"],
        Ongoing => "Ongoing" ["ongoing"],
        Closed => "Closed" ["closed"],
        /// Not today, or the schedule data is unusable.
        Indeterminate => "Indeterminate" ["indeterminate"],
    }
);

impl From<AttemptStatus> for SkillStatus {
    fn from(status: AttemptStatus) -> Self {
        match status {
            AttemptStatus::Cleared => Self::Cleared,
            AttemptStatus::NotCleared => Self::NotCleared,
            AttemptStatus::Ongoing => Self::Ongoing,
        }
    }
}
