pub mod findings;
pub mod message;
pub mod node;
pub mod plan;
pub mod worker;

pub use findings::*;
pub use message::*;
pub use node::*;
pub use plan::*;
pub use worker::*;
