//! Application layer: the two state machines that react to asynchronous
//! external events.
//!
//! `CheckoutReconciler` takes a cart through payment and confirmation.
//! `SensorSampler` runs the fixed-rate sampling pipeline. Both are driven by
//! the shared lifecycle signal and reach the outside world only through the
//! ports in `crate::domain::ports`.

pub mod checkout;
pub mod sampler;
