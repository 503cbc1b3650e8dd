// Builtin attack strategies

mod direct;
mod polite;

pub use direct::DirectStrategy;
pub use polite::{PoliteOptions, PoliteStrategy};
