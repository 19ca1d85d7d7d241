//! # Prover Worker
//!
//! A pull-model proving worker. Part of the epoch prover swarm:
//!
//! ```text
//! Broker (queue)
//!       │
//!       ├──► Worker 1 ──► POST /jobs/pull ──► prove ──► POST /jobs/resolve
//!       ├──► Worker 2 ──► POST /jobs/pull ──► prove ──► POST /jobs/resolve
//!       └──► Worker 3 ──► POST /jobs/pull ──► prove ──► POST /jobs/resolve
//!                              ▲
//!                   heartbeats while proving
//! ```
//!
//! Workers are stateless and interchangeable; correctness lives in the
//! broker's lease discipline, so a worker may crash or stall at any point
//! without corrupting the run.

pub mod client;
pub mod prover;

pub use client::BrokerClient;
pub use prover::{CircuitProver, MockProver, ProverError};
