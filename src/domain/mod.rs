//! Domain layer: transfer types, step results, saga events and the ports the
//! application layer drives.

pub mod events;
pub mod ports;
pub mod steps;
pub mod transfer;
