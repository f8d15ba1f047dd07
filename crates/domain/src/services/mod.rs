//! Domain services for Study Groups.
//!
//! Services hold backend ports and contain the business rules.

pub mod account;
pub mod membership;
pub mod ranking;
pub mod session_recorder;
pub mod stopwatch;
pub mod timer;

pub use account::{AccountService, SignUpInput, SignedIn, UpdateProfileInput};
pub use membership::GroupMembershipManager;
pub use ranking::{leader, rank_members, total_studied_time, RankingService};
pub use session_recorder::{SessionEvidence, StudySessionRecorder};
pub use stopwatch::{Stopwatch, StopwatchError, StopwatchRegistry, TimerSnapshot};
pub use timer::{SessionTimer, TimerError, TimerState};
