pub mod logging;
pub mod rate_limit;
pub mod security;

pub use logging::*;
pub use rate_limit::*;
pub use security::*;
