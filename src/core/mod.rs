pub mod engine;
pub mod order;
pub mod retry;
pub mod session;
