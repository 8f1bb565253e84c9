pub mod attack;
pub mod serve;
pub mod status;

// Re-export command functions for convenience
pub use attack::attack;
pub use serve::{serve, ServeParams};
pub use status::status;
