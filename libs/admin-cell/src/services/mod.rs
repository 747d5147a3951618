pub mod session;

pub use session::AdminSessionService;
