//! Worker thread scheduling.
//!
//! The engine's worker thread can run under a fixed-priority FIFO policy so
//! audio blocks are not preempted by ordinary work, or under the platform's
//! normal time-sharing policy. FIFO needs privileges on most systems
//! (`CAP_SYS_NICE` or an `rtprio` limit on Linux); when they are missing the
//! request fails and the engine refuses to start.

use serde::{Deserialize, Serialize};

/// Scheduling class for engine worker threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulingPolicy {
    /// Fixed-priority, first-in-first-out real-time scheduling.
    #[default]
    Fifo,
    /// Platform default best-effort scheduling. The thread is left untouched.
    Normal,
}

impl std::str::FromStr for SchedulingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fifo" | "realtime" | "rt" => Ok(Self::Fifo),
            "normal" | "other" | "default" => Ok(Self::Normal),
            _ => Err(format!("unknown scheduling policy '{s}' (expected fifo or normal)")),
        }
    }
}

/// Scheduling request for engine worker threads.
///
/// `priority` is an absolute priority for [`SchedulingPolicy::Fifo`], clamped
/// to the range the platform reports for that policy. It is ignored for
/// [`SchedulingPolicy::Normal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadScheduling {
    /// Scheduling class.
    #[serde(default)]
    pub policy: SchedulingPolicy,
    /// Absolute priority within the class.
    #[serde(default)]
    pub priority: i32,
}

impl ThreadScheduling {
    /// FIFO real-time scheduling at `priority`.
    pub const fn fifo(priority: i32) -> Self {
        Self {
            policy: SchedulingPolicy::Fifo,
            priority,
        }
    }

    /// Best-effort scheduling.
    pub const fn normal() -> Self {
        Self {
            policy: SchedulingPolicy::Normal,
            priority: 0,
        }
    }

    /// Apply this request to the calling thread.
    ///
    /// Returns the priority actually in effect.
    pub(crate) fn apply_to_current_thread(self) -> std::io::Result<i32> {
        match self.policy {
            SchedulingPolicy::Normal => Ok(0),
            SchedulingPolicy::Fifo => set_fifo(self.priority),
        }
    }
}

impl Default for ThreadScheduling {
    fn default() -> Self {
        Self::fifo(0)
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn set_fifo(priority: i32) -> std::io::Result<i32> {
    // SAFETY: priority range queries have no preconditions.
    let (min, max) = unsafe {
        (
            libc::sched_get_priority_min(libc::SCHED_FIFO),
            libc::sched_get_priority_max(libc::SCHED_FIFO),
        )
    };
    if min < 0 || max < min {
        return Err(std::io::Error::last_os_error());
    }

    let clamped = priority.clamp(min, max);

    // SAFETY: sched_param is plain data; zeroed is a valid value on every libc
    // target and only sched_priority is read for SCHED_FIFO.
    let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
    param.sched_priority = clamped;

    // SAFETY: pthread_self() is always a valid handle for the calling thread.
    let ret =
        unsafe { libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param) };

    if ret == 0 {
        Ok(clamped)
    } else {
        Err(std::io::Error::from_raw_os_error(ret))
    }
}

#[cfg(not(unix))]
fn set_fifo(_priority: i32) -> std::io::Result<i32> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "FIFO scheduling is not available on this platform",
    ))
}
