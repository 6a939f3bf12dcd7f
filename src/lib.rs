//! Simulated network link: serialization and propagation delay in front
//! of an interface's real send path.

pub mod control;
pub mod header;
pub mod iface;
pub mod pipe;
pub mod protocol;
pub mod sim_tx;
pub mod sink;
pub mod traffic;

pub use control::{ControlError, SimControl, SimParams};
pub use header::QueueHeader;
pub use iface::{Interface, InterfaceStats, SendPath};
pub use pipe::DelayPipe;
