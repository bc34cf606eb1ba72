//! Tool System
//!
//! Extensible tool framework for agent capabilities.
//! Tools are registered at runtime and invoked by the reasoning loop.
//!
//! Invocation never returns an error: a missing tool, bad arguments, a tool
//! returning `Err`, or a panicking tool all come back as a failed
//! [`ToolResult`] that the loop feeds to the model like any other result.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::builtin::{CalculatorTool, WebSearchTool};
use crate::error::{AgentError, Result};
use crate::message::ToolCall;

/// Arguments handed to [`Tool::execute`] after validation
pub type ToolArguments = Map<String, Value>;

/// Parameter definition for tool schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, integer, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Default value if not provided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParameterSchema {
    /// A required parameter
    pub fn required(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
            default: None,
        }
    }

    /// An optional parameter
    pub fn optional(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn accepts(&self, value: &Value) -> bool {
        match self.param_type.as_str() {
            "string" => value.is_string(),
            "integer" => value.is_i64() || value.is_u64(),
            "number" => value.is_number(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            _ => true,
        }
    }
}

/// Tool descriptor (for LLM function calling)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions, in declaration order
    pub parameters: Vec<ParameterSchema>,
}

impl ToolSchema {
    /// Render the parameters as a JSON Schema object
    pub fn parameters_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut property = json!({
                "type": param.param_type,
                "description": param.description,
            });
            if let Some(default) = &param.default {
                property["default"] = default.clone();
            }
            properties.insert(param.name.clone(), property);
        }

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check a raw argument payload against the declared parameters
    pub fn validate_arguments(&self, arguments: &Value) -> Result<ToolArguments> {
        let args = match arguments {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(AgentError::ToolValidation(format!(
                    "Arguments for '{}' must be a JSON object, got: {other}",
                    self.name
                )));
            }
        };

        for param in &self.parameters {
            match args.get(&param.name) {
                None | Some(Value::Null) if param.required => {
                    return Err(AgentError::ToolValidation(format!(
                        "Missing required parameter: {}",
                        param.name
                    )));
                }
                Some(value) if !value.is_null() && !param.accepts(value) => {
                    return Err(AgentError::ToolValidation(format!(
                        "Parameter '{}' must be of type {}",
                        param.name, param.param_type
                    )));
                }
                _ => {}
            }
        }

        Ok(args)
    }
}

/// Outcome of one tool invocation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { value: Value },
    Failure { error: String },
}

/// Result from tool execution
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Correlation id echoed from the request
    pub call_id: String,

    /// Tool that was called
    pub name: String,

    pub outcome: ToolOutcome,
}

impl ToolResult {
    pub fn success(call_id: impl Into<String>, name: impl Into<String>, value: Value) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            outcome: ToolOutcome::Success { value },
        }
    }

    pub fn failure(
        call_id: impl Into<String>,
        name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            outcome: ToolOutcome::Failure {
                error: error.into(),
            },
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ToolOutcome::Failure { error } => Some(error),
            ToolOutcome::Success { .. } => None,
        }
    }

    /// JSON text placed in the tool message sent back to the model
    pub fn to_content(&self) -> String {
        match &self.outcome {
            ToolOutcome::Success { value } => value.to_string(),
            ToolOutcome::Failure { error } => json!({"success": false, "error": error}).to_string(),
        }
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with validated arguments
    async fn execute(&self, args: &ToolArguments) -> Result<Value>;

    /// Validate arguments before execution
    fn validate(&self, arguments: &Value) -> Result<ToolArguments> {
        self.schema().validate_arguments(arguments)
    }
}

/// Registry for available tools
///
/// Reads are concurrent. Registration takes a short write lock and is meant
/// to happen during setup.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

static SHARED_DEFAULT: OnceLock<Arc<ToolRegistry>> = OnceLock::new();

impl ToolRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// Registry holding the built-in calculator and web search tools
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(WebSearchTool);
        registry.register(CalculatorTool);
        registry
    }

    /// Process-wide registry with the built-in tools.
    ///
    /// Agents use it when no registry is supplied. Anything registered here is
    /// visible to every agent sharing it.
    pub fn shared_default() -> Arc<Self> {
        SHARED_DEFAULT
            .get_or_init(|| Arc::new(Self::with_defaults()))
            .clone()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register<T: Tool + 'static>(&self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    /// Register a shared tool, replacing any tool with the same name
    pub fn register_arc(&self, tool: Arc<dyn Tool>) {
        let name = tool.schema().name;
        if self.tools.write().insert(name.clone(), tool).is_some() {
            tracing::debug!(tool = %name, "Replaced existing tool");
        } else {
            tracing::debug!(tool = %name, "Registered tool");
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().get(name).cloned()
    }

    /// All registered tools, in no particular order
    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.read().values().cloned().collect()
    }

    /// Tool names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// One descriptor per registered tool, sorted by name
    pub fn descriptors(&self) -> Vec<ToolSchema> {
        let mut descriptors: Vec<ToolSchema> = self.tools().iter().map(|t| t.schema()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }

    /// Invoke one tool call; failures are reported in the result
    pub async fn invoke(&self, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.get(&call.name) else {
            tracing::warn!(tool = %call.name, call_id = %call.id, "Tool not found");
            let err = AgentError::ToolNotFound(call.name.clone());
            return ToolResult::failure(&call.id, &call.name, err.to_string());
        };

        tracing::debug!(tool = %call.name, call_id = %call.id, args = %call.arguments, "Executing tool");

        match run_tool(tool.as_ref(), &call.arguments).await {
            Ok(value) => ToolResult::success(&call.id, &call.name, value),
            Err(e) => {
                tracing::warn!(tool = %call.name, call_id = %call.id, error = %e, "Tool failed");
                ToolResult::failure(&call.id, &call.name, e.to_string())
            }
        }
    }

    /// Invoke a batch of calls.
    ///
    /// Sequential calls run in request order. Parallel calls run concurrently;
    /// either way every call yields exactly one result carrying its id, and a
    /// failing call does not affect its siblings.
    pub async fn invoke_all(&self, calls: &[ToolCall], parallel: bool) -> Vec<ToolResult> {
        if parallel {
            futures::future::join_all(calls.iter().map(|call| self.invoke(call))).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.invoke(call).await);
            }
            results
        }
    }
}

async fn run_tool(tool: &dyn Tool, arguments: &Value) -> Result<Value> {
    let args = tool.validate(arguments)?;
    AssertUnwindSafe(tool.execute(&args))
        .catch_unwind()
        .await
        .map_err(|panic| AgentError::ToolExecution(panic_message(panic.as_ref())))?
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .map_or_else(|| "tool panicked".into(), |msg| format!("tool panicked: {msg}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct EchoTool {
        name: &'static str,
        description: &'static str,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: self.name.into(),
                description: self.description.into(),
                parameters: vec![ParameterSchema::required("text", "string", "Text to echo")],
            }
        }

        async fn execute(&self, args: &ToolArguments) -> Result<Value> {
            Ok(json!({"echo": args["text"]}))
        }
    }

    struct BrokenTool;

    #[async_trait]
    impl Tool for BrokenTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "broken".into(),
                description: "Always fails".into(),
                parameters: vec![],
            }
        }

        async fn execute(&self, _args: &ToolArguments) -> Result<Value> {
            Err(AgentError::ToolExecution("disk on fire".into()))
        }
    }

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "panicky".into(),
                description: "Panics".into(),
                parameters: vec![],
            }
        }

        async fn execute(&self, _args: &ToolArguments) -> Result<Value> {
            panic!("unexpected state");
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "slow".into(),
                description: "Sleeps a little".into(),
                parameters: vec![ParameterSchema::required("ms", "integer", "Delay")],
            }
        }

        async fn execute(&self, args: &ToolArguments) -> Result<Value> {
            let ms = args["ms"].as_u64().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(json!(ms))
        }
    }

    fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
        ToolCall::new(id, name, arguments)
    }

    #[test]
    fn test_tool_registry() {
        let registry = ToolRegistry::with_defaults();

        assert_eq!(registry.len(), 2);
        assert!(registry.get("web_search").is_some());
        assert!(registry.get("calculator").is_some());
        assert!(registry.get("unknown").is_none());
        assert_eq!(registry.names(), vec!["calculator", "web_search"]);
    }

    #[test]
    fn test_reregistering_replaces() {
        let registry = ToolRegistry::new();
        registry.register(EchoTool {
            name: "echo",
            description: "first",
        });
        registry.register(EchoTool {
            name: "echo",
            description: "second",
        });

        assert_eq!(registry.len(), 1);
        let descriptors = registry.descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].description, "second");
    }

    #[test]
    fn test_parameters_json_schema() {
        let schema = EchoTool {
            name: "echo",
            description: "Echo",
        }
        .schema();
        let rendered = schema.parameters_json_schema();

        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["properties"]["text"]["type"], "string");
        assert_eq!(rendered["required"], json!(["text"]));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_failure_data() {
        let registry = ToolRegistry::new();
        let result = registry.invoke(&call("c1", "teleport", json!({}))).await;

        assert!(!result.is_success());
        assert_eq!(result.call_id, "c1");
        assert_eq!(result.error(), Some("Tool 'teleport' not found"));
    }

    #[tokio::test]
    async fn test_validation_failures() {
        let registry = ToolRegistry::new();
        registry.register(EchoTool {
            name: "echo",
            description: "Echo",
        });

        let missing = registry.invoke(&call("c1", "echo", json!({}))).await;
        assert!(missing.error().unwrap().contains("Missing required parameter: text"));

        let wrong_type = registry.invoke(&call("c2", "echo", json!({"text": 5}))).await;
        assert!(wrong_type.error().unwrap().contains("must be of type string"));

        let not_object = registry.invoke(&call("c3", "echo", json!("{broken"))).await;
        assert!(not_object.error().unwrap().contains("must be a JSON object"));

        let ok = registry.invoke(&call("c4", "echo", json!({"text": "hi"}))).await;
        assert_eq!(ok.outcome, ToolOutcome::Success { value: json!({"echo": "hi"}) });
    }

    #[tokio::test]
    async fn test_tool_errors_and_panics_are_contained() {
        let registry = ToolRegistry::new();
        registry.register(BrokenTool);
        registry.register(PanickingTool);

        let broken = registry.invoke(&call("c1", "broken", json!({}))).await;
        assert!(broken.error().unwrap().contains("disk on fire"));

        let panicked = registry.invoke(&call("c2", "panicky", json!({}))).await;
        assert!(panicked.error().unwrap().contains("unexpected state"));

        let content: Value = serde_json::from_str(&broken.to_content()).unwrap();
        assert_eq!(content["success"], false);
    }

    #[tokio::test]
    async fn test_pathological_calculator_input_is_failure_data() {
        let registry = ToolRegistry::with_defaults();
        let deep = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
        let unary = format!("{}1", "-".repeat(20_000));
        let nested = format!("{}1{}", "(".repeat(400), ")".repeat(400));

        for (id, expression) in [("deep", deep), ("unary", unary), ("nested", nested)] {
            let result = registry
                .invoke(&call(id, "calculator", json!({"expression": expression})))
                .await;
            assert!(!result.is_success(), "{id}");
            assert_eq!(result.call_id, id);
        }
    }

    #[tokio::test]
    async fn test_invoke_all_correlates_by_id() {
        let registry = ToolRegistry::new();
        registry.register(SlowTool);
        registry.register(BrokenTool);

        let calls = vec![
            call("a", "slow", json!({"ms": 30})),
            call("b", "broken", json!({})),
            call("c", "slow", json!({"ms": 1})),
        ];

        for parallel in [false, true] {
            let results = registry.invoke_all(&calls, parallel).await;
            assert_eq!(results.len(), 3);

            let by_id: HashMap<_, _> = results.iter().map(|r| (r.call_id.as_str(), r)).collect();
            assert!(by_id["a"].is_success());
            assert!(!by_id["b"].is_success());
            assert_eq!(by_id["c"].outcome, ToolOutcome::Success { value: json!(1) });
        }
    }
}
