//! Statement generation and submission to the results database.

pub mod credentials;
pub mod statement;
pub mod submit;

pub use credentials::load_credentials;
pub use statement::generate;
pub use submit::submit;
