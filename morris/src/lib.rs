pub use board::*;
pub use protocol_types::*;
pub use visualization::*;

mod board;
mod protocol_types;
mod visualization;
