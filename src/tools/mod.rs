mod definitions;
mod error;
mod executor;
mod impls;
mod parse;
mod result;

pub use definitions::{ToolCall, ToolSpec, TOOL_SPECS};
pub use error::{ToolError, ToolErrorKind};
pub use executor::ToolDispatcher;
pub use parse::parse_operation;
pub use result::{DirectoryEntry, ToolOutput};
