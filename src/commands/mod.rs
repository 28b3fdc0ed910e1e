mod send;

pub use send::{SendOptions, send};
