pub mod delivery;
pub mod metrics;

pub use delivery::*;
pub use metrics::*;
