//! # Proving Job Queue
//!
//! Pull-based work distribution for the epoch prover swarm.
//!
//! ```text
//!                  ┌──────────────────────────────────────┐
//!   enqueue ──────►│            Job Queue                 │
//!   (orchestrator) │                                      │
//!                  │  PENDING ──pull──► LEASED            │
//!                  │     ▲                │               │
//!                  │     │ expiry/reject  ├─resolve─► RESOLVED
//!                  │     └────────────────┤               │
//!                  │       retry budget   └─exhausted─► DEAD
//!                  └──────────────────────────────────────┘
//!                        │          │           │
//!                     Worker 1   Worker 2    Worker 3
//! ```
//!
//! Workers pull jobs, heartbeat while proving, and resolve or reject. A
//! lease that stops heartbeating is reclaimed by a background task and the
//! job returns to the pool, up to a bounded retry budget. Resolutions and
//! terminal failures are pushed to the orchestrator over an event channel.

mod error;
mod queue;

pub use error::{QueueError, Result};
pub use queue::{spawn_reclaimer, JobDiagnostics, ProvingJobQueue, QueueConfig, QueueEvent};
