//! Status enumerations and the one place that decides which transitions are legal.
//!
//! Statuses that the dashboards historically exchanged as integer codes keep
//! those codes on the wire and in storage (`#[serde(into = "u8", try_from = "u8")]`).

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

pub trait Lifecycle: Copy + Eq + Debug {
    const ENTITY: &'static str;

    fn allows(self, next: Self) -> bool;

    fn transition(self, next: Self) -> Result<Self> {
        if self.allows(next) {
            Ok(next)
        } else {
            Err(Error::InvalidTransition {
                entity: Self::ENTITY,
                from: format!("{self:?}"),
                to: format!("{next:?}"),
            })
        }
    }
}

macro_rules! coded_status {
    ($name:ident { $($variant:ident = $code:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(into = "u8", try_from = "u8")]
        pub enum $name {
            $($variant = $code),+
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = String;

            fn try_from(code: u8) -> core::result::Result<Self, Self::Error> {
                match code {
                    $($code => Ok($name::$variant),)+
                    other => Err(format!("unknown {} code {other}", stringify!($name))),
                }
            }
        }
    };
}

coded_status!(ApplicationStatus {
    Pending = 0,
    Approved = 1,
    Rejected = 2,
});

coded_status!(DutyStatus {
    Available = 0,
    Assigned = 1,
    Accepted = 2,
    Rejected = 3,
    Completed = 4,
});

coded_status!(IncidentStatus {
    Pending = 0,
    Verified = 1,
    Deleted = 2,
    Completed = 3,
});

coded_status!(VerificationStatus {
    Pending = 0,
    Verified = 1,
    Rejected = 2,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Assigned,
    Accepted,
    Rejected,
    Completed,
}

impl Lifecycle for ApplicationStatus {
    const ENTITY: &'static str = "volunteer application";

    fn allows(self, next: Self) -> bool {
        use ApplicationStatus::*;
        matches!((self, next), (Pending, Approved) | (Pending, Rejected))
    }
}

impl DutyStatus {
    /// Idle states a new task or shelter duty may start from.
    pub const ASSIGNABLE: [DutyStatus; 3] = [
        DutyStatus::Available,
        DutyStatus::Rejected,
        DutyStatus::Completed,
    ];

    pub fn is_assignable(self) -> bool {
        Self::ASSIGNABLE.contains(&self)
    }
}

impl Lifecycle for DutyStatus {
    const ENTITY: &'static str = "duty";

    fn allows(self, next: Self) -> bool {
        use DutyStatus::*;
        matches!(
            (self, next),
            (Available, Assigned)
                | (Assigned, Accepted)
                | (Assigned, Rejected)
                | (Assigned, Available)
                | (Accepted, Completed)
                | (Accepted, Available)
                | (Rejected, Assigned)
                | (Rejected, Available)
                | (Completed, Assigned)
                | (Completed, Available)
        )
    }
}

impl Lifecycle for IncidentStatus {
    const ENTITY: &'static str = "incident";

    fn allows(self, next: Self) -> bool {
        use IncidentStatus::*;
        matches!(
            (self, next),
            (Pending, Verified) | (Pending, Deleted) | (Verified, Completed) | (Verified, Deleted)
        )
    }
}

impl Lifecycle for VerificationStatus {
    const ENTITY: &'static str = "contribution";

    fn allows(self, next: Self) -> bool {
        use VerificationStatus::*;
        matches!((self, next), (Pending, Verified) | (Pending, Rejected))
    }
}

impl Lifecycle for TaskStatus {
    const ENTITY: &'static str = "task";

    fn allows(self, next: Self) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Assigned, Accepted)
                | (Assigned, Rejected)
                | (Accepted, Completed)
                | (Accepted, Rejected)
                | (Rejected, Assigned)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duty_cannot_jump_from_available_to_completed() {
        assert!(DutyStatus::Available.transition(DutyStatus::Completed).is_err());
        assert!(DutyStatus::Assigned.transition(DutyStatus::Completed).is_err());
        assert_eq!(
            DutyStatus::Accepted.transition(DutyStatus::Completed).unwrap(),
            DutyStatus::Completed
        );
    }

    #[test]
    fn assignable_states_all_lead_to_assigned() {
        for state in DutyStatus::ASSIGNABLE {
            assert!(state.is_assignable());
            assert!(state.allows(DutyStatus::Assigned), "{state:?}");
        }
        assert!(!DutyStatus::Accepted.is_assignable());
        assert!(!DutyStatus::Assigned.is_assignable());
    }

    #[test]
    fn incident_only_moves_forward() {
        use IncidentStatus::*;
        assert!(Pending.allows(Verified));
        assert!(Verified.allows(Completed));
        assert!(!Pending.allows(Completed));
        assert!(!Completed.allows(Verified));
        assert!(!Deleted.allows(Pending));
    }

    #[test]
    fn application_and_contribution_decide_once() {
        assert!(ApplicationStatus::Pending.allows(ApplicationStatus::Approved));
        assert!(!ApplicationStatus::Approved.allows(ApplicationStatus::Rejected));
        assert!(VerificationStatus::Pending.allows(VerificationStatus::Verified));
        assert!(!VerificationStatus::Verified.allows(VerificationStatus::Verified));
    }

    #[test]
    fn task_rejection_allows_reassignment() {
        assert!(TaskStatus::Rejected.allows(TaskStatus::Assigned));
        assert!(TaskStatus::Accepted.allows(TaskStatus::Rejected));
        assert!(!TaskStatus::Completed.allows(TaskStatus::Assigned));
    }

    #[test]
    fn any_duty_except_available_can_be_released() {
        use DutyStatus::*;
        for state in [Assigned, Accepted, Rejected, Completed] {
            assert!(state.allows(Available), "{state:?}");
        }
        assert!(Available.transition(Available).is_err());
    }

    #[test]
    fn coded_statuses_serialize_as_integers() {
        assert_eq!(serde_json::to_string(&DutyStatus::Completed).unwrap(), "4");
        assert_eq!(
            serde_json::from_str::<ApplicationStatus>("1").unwrap(),
            ApplicationStatus::Approved
        );
        assert!(serde_json::from_str::<IncidentStatus>("9").is_err());
        assert_eq!(serde_json::to_string(&TaskStatus::Completed).unwrap(), "\"completed\"");
    }
}
