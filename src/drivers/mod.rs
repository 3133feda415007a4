// src/drivers/mod.rs
// Board collaborators: analog front end, filter primitive, screen and storage.
pub mod display;
pub mod error;
pub mod filter;
pub mod frontend;
pub mod storage;
pub use display::{Color, Display, FrameBuffer, TextStyle};
pub use error::DeviceError;
pub use filter::SecondOrderLowPass;
pub use frontend::{FrontEnd, SimulatedFrontEnd};
pub use storage::{DirStorage, Storage};
#[cfg(test)]
pub use frontend::ScriptedFrontEnd;
#[cfg(test)]
pub use storage::MemStorage;
