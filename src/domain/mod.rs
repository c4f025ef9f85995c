//! Domain types and the ports the application layer talks through.

pub mod cart;
pub mod fraud;
pub mod lifecycle;
pub mod payment;
pub mod ports;
pub mod sensor;
