pub mod error;
pub mod filter;
pub mod traits;
pub mod types;

pub use error::*;
pub use filter::*;
pub use traits::*;
pub use types::*;

// Cancellation is part of every collaborator signature, so re-export the token type.
pub use tokio_util::sync::CancellationToken;
