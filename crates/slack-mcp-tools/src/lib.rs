//! slack-mcp-tools: tool registry, conversation access guard, and
//! the per-invocation dispatcher.
//!
//! Raw transport input enters through [`registry::validate`] and
//! leaves as a typed [`registry::ToolArgs`]; nothing downstream ever
//! sees untyped JSON. The [`dispatcher::Dispatcher`] then drives
//! credential resolution, the membership guard, and the Slack call,
//! folding every outcome into a well-formed `ToolResult`.

pub mod dispatcher;
pub mod guard;
pub mod registry;

pub use dispatcher::{DispatchOptions, Dispatcher};
pub use registry::{ToolArgs, ToolSpec, ValidateError};
