//! Aggregation engine: the control plane tying modules to stdout.
//!
//! Modules send whole batches over a single rendezvous channel. The engine
//! keeps the latest batch per slot and re-serializes everything on each
//! update. Pausing simply stops receiving, which leaves every module blocked
//! in its send until the resume signal arrives.

mod session;
mod state;


pub use session::{render_line, write_preamble, Control, Engine};
pub use state::{EngineState, ModuleSlot, Phase};
