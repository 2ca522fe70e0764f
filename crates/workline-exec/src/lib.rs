//! Stock units of work for the workline engine.

mod error;
pub use error::ExecError;

pub mod sim;
pub use sim::SimWork;

pub mod guard;
pub use guard::Guarded;

#[cfg(feature = "proc")]
pub mod proc;
#[cfg(feature = "proc")]
pub use proc::{ProcConfig, ProcWork};

pub mod prelude {
    pub use crate::error::ExecError;
    pub use crate::{Guarded, SimWork};

    #[cfg(feature = "proc")]
    pub use crate::{ProcConfig, ProcWork};
}
