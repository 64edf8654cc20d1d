pub mod history;
pub mod routes;
pub mod stream;

pub use stream::{WebState, WsMessage};
