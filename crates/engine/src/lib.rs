//! Notification fan-out and delivery-tracking engine.
//!
//! One notification flows through the engine as follows:
//! 1. [`targeting::TargetResolver`] turns the notification's declared
//!    targeting into the final, deduplicated recipient set
//! 2. [`dispatch::DispatchEngine`] fans out per-recipient send units under a
//!    bounded worker pool, gating each channel via
//!    [`preference::PreferenceGate`]
//! 3. [`ledger::DeliveryLedger`] records every per-channel outcome on the
//!    durable (notification, recipient) delivery row
//! 4. [`retry::RetryCoordinator`] later resubmits only the failed
//!    (record, channel) pairs, bounded by a persisted attempt budget

pub mod dispatch;
pub mod ledger;
pub mod notification;
pub mod preference;
pub mod retry;
pub mod targeting;
