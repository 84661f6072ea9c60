pub mod bootstrap;
pub mod encoder;
pub mod event;
pub mod factory;

pub use bootstrap::*;
pub use encoder::*;
pub use event::*;
pub use factory::*;

#[cfg(test)]
pub(crate) use event::test_event;
