//! Built-in tool set.
//!
//! Seeded into a fresh registry and restored whenever the stored document
//! is missing or unusable. Every tool is plain Lua against the `runtime`
//! global, so the loops can improve them like any other tool.

use toolforge_domain::well_known::{
    CREATE_TOOL, ECHO, IMPROVE_TOOL, REQUEST_HUMAN_INPUT, SELF_TEST_TOOL, TASK_COMPLETE,
    VERIFY_TOOL,
};
use toolforge_domain::{NewTool, RegistryDocument, ToolCategory, ToolParameter, ToolRegistry};
use tracing::warn;

const CREATE_TOOL_LUA: &str = r#"return function(args, runtime)
  local tool = runtime.tools.add(args)
  local ok, err = runtime.tools.check_syntax(tool.name)
  return { id = tool.id, name = tool.name, version = tool.version, syntaxOk = ok, syntaxError = err }
end"#;

const IMPROVE_TOOL_LUA: &str = r#"return function(args, runtime)
  if type(args.name) ~= "string" then
    error("Improve Existing Tool needs the name of the tool to change")
  end
  -- explicit nulls are kept so the registry can reject them
  local fields = {}
  for key, value in pairs(args) do
    if key ~= "name" then
      fields[key] = value
    end
  end
  if next(fields) == nil then
    error("nothing to change for " .. args.name)
  end
  local tool = runtime.tools.update(args.name, fields)
  return { name = tool.name, version = tool.version }
end"#;

const SELF_TEST_TOOL_LUA: &str = r#"-- Compile-checks a tool's implementation without running it.
local function self_test(args, runtime)
  local target = runtime.tools.get(args.name)
  if target == nil then
    error("Tool not found: " .. tostring(args.name))
  end
  local ok, err = runtime.tools.check_syntax(args.name)
  if not ok then
    error("syntax check failed for " .. args.name .. ": " .. tostring(err))
  end
  return { name = target.name, version = target.version, passed = true }
end"#;

const VERIFY_TOOL_LUA: &str = r#"return function(args, runtime)
  local verdict = runtime.ai.verify(args.name)
  if not verdict.isCorrect then
    error("verification failed for " .. tostring(args.name) .. ": " .. tostring(verdict.reasoning))
  end
  return { name = args.name, verified = true, reasoning = verdict.reasoning }
end"#;

const TASK_COMPLETE_LUA: &str = r#"-- Ends the current task.
return { summary = args.summary }"#;

const REQUEST_HUMAN_INPUT_LUA: &str = r#"return function(args)
  return { status = "awaiting_input", prompt = args.prompt or "Input needed" }
end"#;

const ECHO_LUA: &str = r#"local function echo(message, prefix)
  if prefix ~= nil then
    return prefix .. tostring(message)
  end
  return message
end"#;

/// Payloads for every built-in tool, in seeding order.
pub fn default_tools() -> Vec<NewTool> {
    let tool_fields = || {
        vec![
            ToolParameter::new("description", "what the tool does", false),
            ToolParameter::new("category", "ui, functional, automation or server", false),
            ToolParameter::new("implementation", "Lua 5.4 source", false),
            ToolParameter::new("parameters", "declared parameters", false).with_type("array"),
        ]
    };

    let mut create = NewTool::new(
        CREATE_TOOL,
        "Registers a new tool from a name, description, category and Lua implementation",
        ToolCategory::Automation,
        CREATE_TOOL_LUA,
    )
    .with_parameter(ToolParameter::new("name", "unique tool name", true));
    for param in tool_fields() {
        create = create.with_parameter(param);
    }

    let mut improve = NewTool::new(
        IMPROVE_TOOL,
        "Changes the description, category, implementation or parameters of an existing tool",
        ToolCategory::Automation,
        IMPROVE_TOOL_LUA,
    )
    .with_parameter(ToolParameter::new("name", "tool to change", true));
    for param in tool_fields() {
        improve = improve.with_parameter(param);
    }

    vec![
        create,
        improve,
        NewTool::new(
            SELF_TEST_TOOL,
            "Checks that a tool's implementation compiles",
            ToolCategory::Automation,
            SELF_TEST_TOOL_LUA,
        )
        .with_parameter(ToolParameter::new("name", "tool to test", true)),
        NewTool::new(
            VERIFY_TOOL,
            "Asks the model whether a tool's implementation matches its description",
            ToolCategory::Automation,
            VERIFY_TOOL_LUA,
        )
        .with_parameter(ToolParameter::new("name", "tool to verify", true)),
        NewTool::new(
            TASK_COMPLETE,
            "Signals that the current task or goal is fully achieved",
            ToolCategory::Functional,
            TASK_COMPLETE_LUA,
        )
        .with_parameter(ToolParameter::new("summary", "what was achieved", false)),
        NewTool::new(
            REQUEST_HUMAN_INPUT,
            "Pauses and asks the human operator a question",
            ToolCategory::Ui,
            REQUEST_HUMAN_INPUT_LUA,
        )
        .with_parameter(ToolParameter::new("prompt", "question to ask", true)),
        NewTool::new(
            ECHO,
            "Returns the given message, optionally prefixed",
            ToolCategory::Functional,
            ECHO_LUA,
        )
        .with_parameter(ToolParameter::new("message", "text to return", true))
        .with_parameter(ToolParameter::new("prefix", "text put in front", false)),
    ]
}

/// Add every built-in tool `registry` lacks.
pub fn seed_defaults(registry: &mut ToolRegistry) -> usize {
    let mut added = 0;
    for payload in default_tools() {
        if registry.contains(&payload.name) {
            continue;
        }
        let name = payload.name.clone();
        match registry.add(payload) {
            Ok(_) => added += 1,
            Err(e) => warn!(tool = %name, error = %e, "Failed to seed built-in tool"),
        }
    }
    added
}

/// A fresh document holding only the built-in tools.
pub fn default_document() -> RegistryDocument {
    let mut registry = ToolRegistry::new();
    seed_defaults(&mut registry);
    RegistryDocument::from_registry(&registry, Vec::new())
}
