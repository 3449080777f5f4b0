mod acceptor;
pub mod benchmark;
pub mod board;
pub mod error;
mod worker;

pub use acceptor::{handshake, serve};
pub use error::{Result, WorkerErr};
pub use worker::Worker;
