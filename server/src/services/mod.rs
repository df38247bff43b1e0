pub mod availability;
pub mod codes;
pub mod issuance;
pub mod notifications;
pub mod statistics;

pub use codes::{CodeGenerator, IssuedCodes, ScannableImage};
pub use issuance::{IssuanceError, IssuanceService};
pub use notifications::NotificationDispatcher;
