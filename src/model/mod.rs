pub mod evaluation;
pub mod message;
pub mod protocol;
pub mod session;
