pub mod assemble;
pub mod flow;
pub mod guest;
pub mod orchestrator;
pub mod reconcile;
pub mod reference;
pub mod stay;

pub use flow::{FlowError, FlowStage};
pub use guest::{ContactForm, Guest, GuestSnapshot, RoomGuests};
pub use orchestrator::PaymentOrchestrator;
pub use reconcile::{Confirmation, ReconcileError, Reconciler};
