pub mod request;
pub mod response;
pub mod session;

pub use request::*;
pub use response::*;
pub use session::*;
