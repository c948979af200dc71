//! CPU time accounting for finished child processes.
//!
//! On unix the kernel keeps cumulative user/system time of all reaped
//! children (`RUSAGE_CHILDREN`). A snapshot taken before and after one
//! attempt gives that attempt's CPU time, provided no other child is reaped
//! in between. The runner only asks for it when attempts never overlap.

use std::time::Duration;

/// Cumulative CPU time of reaped children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct CpuTimes {
    pub user: Duration,
    pub system: Duration,
}

impl CpuTimes {
    /// Current totals, or `None` where the platform does not report them.
    #[cfg(unix)]
    pub fn children() -> Option<Self> {
        use nix::sys::resource::{getrusage, UsageWho};
        use nix::sys::time::TimeVal;

        fn to_duration(tv: TimeVal) -> Duration {
            let secs = u64::try_from(tv.tv_sec()).unwrap_or(0);
            let micros = u64::try_from(tv.tv_usec()).unwrap_or(0);
            Duration::from_secs(secs) + Duration::from_micros(micros)
        }

        let usage = getrusage(UsageWho::RUSAGE_CHILDREN).ok()?;
        Some(Self {
            user: to_duration(usage.user_time()),
            system: to_duration(usage.system_time()),
        })
    }

    #[cfg(not(unix))]
    pub fn children() -> Option<Self> {
        None
    }

    /// Time spent between `earlier` and `self`.
    pub fn since(self, earlier: CpuTimes) -> CpuTimes {
        CpuTimes {
            user: self.user.saturating_sub(earlier.user),
            system: self.system.saturating_sub(earlier.system),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn since_never_goes_negative() {
        let earlier = CpuTimes {
            user: Duration::from_millis(20),
            system: Duration::from_millis(5),
        };
        let later = CpuTimes {
            user: Duration::from_millis(35),
            system: Duration::from_millis(1),
        };
        let delta = later.since(earlier);
        assert_eq!(delta.user, Duration::from_millis(15));
        assert_eq!(delta.system, Duration::ZERO);
    }

    #[cfg(unix)]
    #[test]
    fn children_totals_are_available_on_unix() {
        assert!(CpuTimes::children().is_some());
    }
}
