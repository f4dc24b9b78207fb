//! Lua 5.4 execution sandbox.
//!
//! Every invocation gets a fresh VM, so tools cannot leak state into each
//! other. The VM loads only the pure standard libraries and each chunk runs
//! in an environment built from an allowlist; `io`, `package`, `require`,
//! `load`, `dofile` and `debug` are unreachable. `print` is routed to
//! `tracing`.
//!
//! Limits:
//! - memory: `Lua::set_memory_limit`
//! - wall clock: an instruction-count hook checks a deadline, and the whole
//!   invocation is wrapped in `tokio::time::timeout` for time spent awaiting

use super::convert::{error_message, from_lua, to_lua};
use super::runtime_api::register_runtime_api;
use super::shape::{Convention, Shape, is_runtime_like};
use async_trait::async_trait;
use mlua::prelude::*;
use serde_json::Value;
use std::time::{Duration, Instant};
use toolforge_application::config::SandboxParams;
use toolforge_application::{ExecutionSandbox, RuntimeApi};
use toolforge_domain::{ExecutionError, Tool};
use tracing::{debug, info};

/// Globals copied into every tool environment.
const ALLOWED_GLOBALS: [&str; 16] = [
    "string", "table", "math", "utf8", "pairs", "ipairs", "next", "select", "type", "tostring",
    "tonumber", "error", "assert", "pcall", "xpcall", "setmetatable",
];

/// Functions exposed from `os`.
const ALLOWED_OS: [&str; 3] = ["time", "clock", "date"];

/// Instructions between deadline checks.
const HOOK_INTERVAL: u32 = 10_000;

pub struct LuaSandbox {
    timeout: Duration,
    memory_limit: usize,
}

impl LuaSandbox {
    pub fn new() -> Self {
        Self::from_params(&SandboxParams::default())
    }

    pub fn from_params(params: &SandboxParams) -> Self {
        Self {
            timeout: params.timeout,
            memory_limit: params.memory_limit_bytes,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = bytes;
        self
    }

    fn new_vm(&self) -> LuaResult<Lua> {
        let libs = LuaStdLib::STRING | LuaStdLib::TABLE | LuaStdLib::MATH | LuaStdLib::UTF8 | LuaStdLib::OS;
        let lua = Lua::new_with(libs, LuaOptions::default())?;
        lua.set_memory_limit(self.memory_limit)?;

        let deadline = Instant::now() + self.timeout;
        let timeout = self.timeout;
        lua.set_hook(
            LuaHookTriggers::new().every_nth_instruction(HOOK_INTERVAL),
            move |_lua, _debug| {
                if Instant::now() >= deadline {
                    return Err(LuaError::runtime(format!("timed out after {:?}", timeout)));
                }
                Ok(LuaVmState::Continue)
            },
        );
        Ok(lua)
    }

    /// Environment with the allowlisted globals plus `args`, `runtime` and
    /// the `null` sentinel for explicit JSON nulls.
    fn environment(
        &self,
        lua: &Lua,
        tool: &Tool,
        args: &LuaValue,
        runtime: &LuaTable,
    ) -> LuaResult<LuaTable> {
        let globals = lua.globals();
        let env = lua.create_table()?;
        for name in ALLOWED_GLOBALS {
            env.set(name, globals.get::<LuaValue>(name)?)?;
        }

        let os: LuaTable = globals.get("os")?;
        let safe_os = lua.create_table()?;
        for name in ALLOWED_OS {
            safe_os.set(name, os.get::<LuaValue>(name)?)?;
        }
        env.set("os", safe_os)?;

        let tostring: LuaFunction = globals.get("tostring")?;
        let tool_name = tool.name.clone();
        env.set(
            "print",
            lua.create_function(move |_, values: LuaMultiValue| {
                let parts = values
                    .into_iter()
                    .map(|v| tostring.call::<String>(v))
                    .collect::<LuaResult<Vec<_>>>()?;
                info!(target: "toolforge::lua", tool = %tool_name, "{}", parts.join("\t"));
                Ok(())
            })?,
        )?;

        env.set("null", LuaValue::NULL)?;
        env.set("args", args.clone())?;
        env.set("runtime", runtime.clone())?;
        env.set("_G", env.clone())?;
        Ok(env)
    }

    async fn execute(&self, tool: &Tool, args: Value, api: RuntimeApi) -> LuaResult<Value> {
        let lua = self.new_vm()?;
        let args = to_lua(&lua, &args)?;
        let runtime = register_runtime_api(&lua, api)?;
        let env = self.environment(&lua, tool, &args, &runtime)?;

        let output: LuaValue = match Shape::detect(&tool.implementation) {
            Shape::Statements => {
                lua.load(tool.implementation.as_str())
                    .set_name(tool.name.as_str())
                    .set_environment(env)
                    .eval_async()
                    .await?
            }
            Shape::Named { name, params } => {
                let source = format!("{}\nreturn {}", tool.implementation, name);
                let function: LuaFunction = lua
                    .load(source)
                    .set_name(tool.name.as_str())
                    .set_environment(env)
                    .eval_async()
                    .await?;
                call(function, &params, args, runtime).await?
            }
            Shape::Anonymous { params } => {
                let function: LuaFunction = lua
                    .load(tool.implementation.as_str())
                    .set_name(tool.name.as_str())
                    .set_environment(env)
                    .eval_async()
                    .await?;
                call(function, &params, args, runtime).await?
            }
        };

        from_lua(&lua, output)
    }
}

impl Default for LuaSandbox {
    fn default() -> Self {
        Self::new()
    }
}

async fn call(
    function: LuaFunction,
    params: &[String],
    args: LuaValue,
    runtime: LuaTable,
) -> LuaResult<LuaValue> {
    match Convention::from_params(params) {
        Convention::ArgsAndRuntime => function.call_async((args, runtime)).await,
        Convention::ArgsOnly => function.call_async(args).await,
        Convention::Positional(names) => {
            let mut values = Vec::with_capacity(names.len());
            for name in &names {
                let value = if is_runtime_like(name) {
                    LuaValue::Table(runtime.clone())
                } else if let LuaValue::Table(bag) = &args {
                    match bag.get::<LuaValue>(name.as_str())? {
                        LuaValue::LightUserData(ud) if ud.0.is_null() => LuaValue::Nil,
                        value => value,
                    }
                } else {
                    LuaValue::Nil
                };
                values.push(value);
            }
            function.call_async(LuaMultiValue::from_vec(values)).await
        }
    }
}

#[async_trait]
impl ExecutionSandbox for LuaSandbox {
    async fn run(
        &self,
        tool: &Tool,
        args: Value,
        runtime: RuntimeApi,
    ) -> Result<Value, ExecutionError> {
        let started = Instant::now();
        let depth = runtime.depth();
        let outcome = tokio::time::timeout(self.timeout, self.execute(tool, args, runtime)).await;

        match outcome {
            Ok(Ok(value)) => {
                debug!(tool = %tool.name, depth, elapsed_ms = started.elapsed().as_millis() as u64, "Tool returned");
                Ok(value)
            }
            Ok(Err(e)) => {
                debug!(tool = %tool.name, depth, error = %e, "Tool raised");
                Err(ExecutionError::raised(error_message(&e)))
            }
            Err(_) => Err(ExecutionError::raised(format!(
                "'{}' timed out after {:?}",
                tool.name, self.timeout
            ))),
        }
    }

    fn check_syntax(&self, implementation: &str) -> Result<(), ExecutionError> {
        let lua = self
            .new_vm()
            .map_err(|e| ExecutionError::raised(error_message(&e)))?;
        lua.load(implementation)
            .set_name("check_syntax")
            .into_function()
            .map(|_| ())
            .map_err(|e| ExecutionError::raised(error_message(&e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubGateway, runtime_with};
    use serde_json::json;
    use toolforge_domain::{NewTool, ToolCall, ToolCategory};

    fn tool(name: &str, implementation: &str) -> NewTool {
        NewTool::new(name, format!("{} tool", name), ToolCategory::Functional, implementation)
    }

    async fn run(tools: Vec<NewTool>, call: ToolCall) -> toolforge_domain::EnrichedResult {
        let runtime = runtime_with(LuaSandbox::new(), StubGateway::new(), tools);
        runtime.execute(&call).await
    }

    #[tokio::test]
    async fn test_statement_shape_sees_args() {
        let result = run(
            vec![tool("Add", "return args.a + args.b")],
            ToolCall::new("Add").with_arg("a", 2).with_arg("b", 3),
        )
        .await;
        assert_eq!(result.execution_result, Some(json!(5)));
    }

    #[tokio::test]
    async fn test_named_function_conventions() {
        let tools = vec![
            tool("Bag", "function bag(input)\n  return input.x * 2\nend"),
            tool(
                "Greet",
                "local function greet(name, greeting)\n  return greeting .. ', ' .. name\nend",
            ),
            tool(
                "Pair",
                "function pair(args, ctx)\n  return ctx.tools.get('Bag').name .. args.suffix\nend",
            ),
        ];
        let runtime = runtime_with(LuaSandbox::new(), StubGateway::new(), tools);

        let bag = runtime.execute(&ToolCall::new("Bag").with_arg("x", 21)).await;
        assert_eq!(bag.execution_result, Some(json!(42)));

        let greet = runtime
            .execute(
                &ToolCall::new("Greet")
                    .with_arg("name", "Ada")
                    .with_arg("greeting", "Hello"),
            )
            .await;
        assert_eq!(greet.execution_result, Some(json!("Hello, Ada")));

        let pair = runtime
            .execute(&ToolCall::new("Pair").with_arg("suffix", "!"))
            .await;
        assert_eq!(pair.execution_result, Some(json!("Bag!")));
    }

    #[tokio::test]
    async fn test_anonymous_function_runs_nested_tool() {
        let tools = vec![
            tool("Double", "return args.n * 2"),
            tool(
                "Quadruple",
                "return function(args, runtime)\n  return runtime.tools.run('Double', { n = runtime.tools.run('Double', { n = args.n }) })\nend",
            ),
        ];
        let result = run(tools, ToolCall::new("Quadruple").with_arg("n", 3)).await;
        assert_eq!(result.execution_result, Some(json!(12)));
    }

    #[tokio::test]
    async fn test_raised_error_keeps_message() {
        let result = run(vec![tool("Boom", "error('boom goes the tool')")], ToolCall::new("Boom")).await;
        let err = result.execution_error.unwrap();
        assert!(err.is_raised());
        assert!(err.message.contains("boom goes the tool"));
    }

    #[tokio::test]
    async fn test_nested_failure_can_be_caught() {
        let tools = vec![
            tool("Boom", "error('inner failure')"),
            tool(
                "Careful",
                "local ok, err = pcall(runtime.tools.run, 'Boom', {})\nreturn { ok = ok, err = tostring(err) }",
            ),
        ];
        let result = run(tools, ToolCall::new("Careful")).await;
        let value = result.execution_result.unwrap();
        assert_eq!(value["ok"], json!(false));
        assert!(value["err"].as_str().unwrap().contains("inner failure"));
    }

    #[tokio::test]
    async fn test_unbounded_recursion_hits_depth_guard() {
        let result = run(
            vec![tool("Loop", "return runtime.tools.run('Loop', args)")],
            ToolCall::new("Loop"),
        )
        .await;
        let err = result.execution_error.unwrap();
        assert!(err.message.contains("call depth limit"));
    }

    #[tokio::test]
    async fn test_environment_is_restricted() {
        let result = run(
            vec![tool(
                "Probe",
                "return { io = io == nil, require = require == nil, load = load == nil, exec = os.execute == nil, time = type(os.time()) }",
            )],
            ToolCall::new("Probe"),
        )
        .await;
        assert_eq!(
            result.execution_result,
            Some(json!({"io": true, "require": true, "load": true, "exec": true, "time": "number"}))
        );
    }

    #[tokio::test]
    async fn test_runaway_loop_times_out() {
        let runtime = runtime_with(
            LuaSandbox::new().with_timeout(Duration::from_millis(200)),
            StubGateway::new(),
            vec![tool("Spin", "while true do end")],
        );
        let result = runtime.execute(&ToolCall::new("Spin")).await;
        assert!(result.execution_error.unwrap().message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_memory_limit() {
        let runtime = runtime_with(
            LuaSandbox::new().with_memory_limit(2 * 1024 * 1024),
            StubGateway::new(),
            vec![tool("Hog", "local t = {}\nfor i = 1, 1e8 do t[i] = string.rep('x', 64) .. i end")],
        );
        let result = runtime.execute(&ToolCall::new("Hog")).await;
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_tools_add_and_update_from_lua() {
        let tools = vec![tool(
            "Maker",
            "local t = runtime.tools.add({ name = 'Made', description = 'made in lua', implementation = 'return 7' })\nlocal u = runtime.tools.update('Made', { description = 'remade' })\nreturn { id = t.id, v1 = t.version, v2 = u.version }",
        )];
        let runtime = runtime_with(LuaSandbox::new(), StubGateway::new(), tools);
        let result = runtime.execute(&ToolCall::new("Maker")).await;
        assert_eq!(
            result.execution_result,
            Some(json!({"id": "made", "v1": 1, "v2": 2}))
        );
        assert_eq!(runtime.registry().get("Made").unwrap().description, "remade");

        let made = runtime.execute(&ToolCall::new("Made")).await;
        assert_eq!(made.execution_result, Some(json!(7)));
    }

    #[tokio::test]
    async fn test_duplicate_add_raises() {
        let result = run(
            vec![tool("Dup", "return runtime.tools.add({ name = 'Dup', description = 'again', implementation = 'return 1' })")],
            ToolCall::new("Dup"),
        )
        .await;
        assert!(result.execution_error.unwrap().message.contains("already exists"));
    }

    #[test]
    fn test_check_syntax() {
        let sandbox = LuaSandbox::new();
        assert!(sandbox.check_syntax("function ok(a) return a end").is_ok());
        let err = sandbox.check_syntax("function broken( return end").unwrap_err();
        assert!(err.is_raised());
        assert!(!err.message.is_empty());
    }

    #[tokio::test]
    async fn test_ai_verify_binding() {
        let tools = vec![tool(
            "Checker",
            "local verdict = runtime.ai.verify('Checker')\nreturn verdict.isCorrect",
        )];
        let runtime = runtime_with(
            LuaSandbox::new(),
            StubGateway::new().with_verification(false, "wrong"),
            tools,
        );
        let result = runtime.execute(&ToolCall::new("Checker")).await;
        assert_eq!(result.execution_result, Some(json!(false)));
    }
}
