//! Built-in Tools
//!
//! The default capability set registered by [`ToolRegistry::with_defaults`].
//! Both are deterministic, so the loop's tool-calling machinery can be
//! exercised without side effects.
//!
//! [`ToolRegistry::with_defaults`]: crate::tool::ToolRegistry::with_defaults

mod calculator;
mod web_search;

pub use calculator::{CalculatorTool, evaluate_expression};
pub use web_search::WebSearchTool;
