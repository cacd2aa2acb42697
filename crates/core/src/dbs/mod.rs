//! Per-request execution state shared by every resolver of one request.

mod session;

pub use self::session::Session;
