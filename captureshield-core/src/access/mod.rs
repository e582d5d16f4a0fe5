//! Camera Access Gating
//!
//! The [`AccessController`] turns containment results into an access verdict
//! and owns everything that follows from it: the recorded camera permission,
//! the open capture session, and the cooldown that keeps access-change
//! notifications from flooding the user.
//!
//! # State machine
//!
//! ```text
//!            inside any zone
//!   Unknown ────────────────► Blocked
//!      │                       ▲   │
//!      │ outside all zones     │   │
//!      ▼                       │   ▼
//!   Allowed ◄──────────────────┘ (flip on every re-evaluation)
//! ```
//!
//! Entering `Blocked` closes an open capture session before the new state
//! becomes visible. Access-change notifications are dropped, not queued,
//! while the cooldown is running.

mod controller;
mod notification;

pub use controller::*;
pub use notification::*;
