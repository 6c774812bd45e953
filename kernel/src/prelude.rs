//! Common imports for crates that host actors on top of the kernel.
//!
//! ```
//! use slug_kernel::prelude::*;
//! ```

pub use crate::actor::{ActorContext, ControlSignal, Handler, HandlerFactory};
pub use crate::config::KernelConfig;
pub use crate::error::KernelError;
pub use crate::id::ActorId;
pub use crate::kernel::Kernel;
pub use crate::message::Message;
pub use crate::policy::OperationMap;
pub use crate::rights::Rights;
