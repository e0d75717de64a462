pub mod payment;
pub mod repository;
pub mod supplier;
pub mod vendor;

/// Error type at the adapter seams; concrete errors are boxed so supplier,
/// gateway and repository implementations stay swappable.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
