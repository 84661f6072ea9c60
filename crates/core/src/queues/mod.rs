pub mod batch_window;
pub mod fifo_drop_oldest_queue;

pub use batch_window::*;
pub use fifo_drop_oldest_queue::*;
