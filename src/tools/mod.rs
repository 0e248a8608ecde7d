//! Local tools the model can call.
//!
//! The registry advertises four device tools and dispatches calls to a
//! [`CommandExecutor`]. The bundled [`LocalCommandExecutor`] phrases replies
//! and hands the actual OS work to a [`DeviceLauncher`].

pub mod alarm;
pub mod executor;
pub mod launcher;
pub mod registry;
pub mod types;

pub use executor::{CommandExecutor, LocalCommandExecutor};
pub use launcher::{DeviceLauncher, LaunchError, ShellLauncher};
pub use registry::{builtin_declarations, ToolRegistry};
pub use types::{ParamType, ParameterSpec, ToolDeclaration, ToolInvocationResult};
