//! Engine events and the hooks that subscribe to them.
//!
//! * [`OrderReconciledEvent`] fires after a payment is credited to an account.
//! * [`ReviewRequiredEvent`] fires when an order needs a human, e.g. after a confirmed payment could not be written to
//!   the ledger. This is where alerting plugs in.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
