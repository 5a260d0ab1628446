//! Application layer: the five saga components.
//!
//! `SettlementSaga` is the entry point. It drives the `VerificationGateway`,
//! the optional `AttestationBroadcaster`, the `SettlementClient` and the
//! `OutcomeLedger` in that order, and is the only place where a step's
//! failure is judged terminal or non-fatal.

pub mod attestation;
pub mod coordinator;
pub mod disconnect;
pub mod observer;
pub mod outcome_ledger;
pub mod settlement;
pub mod state;
pub mod verification;
