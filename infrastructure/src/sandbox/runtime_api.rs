//! The `runtime` global handed to tool implementations.
//!
//! ```lua
//! local tool = runtime.tools.get("Echo")
//! local out = runtime.tools.run("Echo", { message = "hi" })
//! runtime.tools.add({ name = "Timer", description = "...", implementation = "..." })
//! runtime.tools.update("Timer", { description = "Counts down" })
//! local ok, err = runtime.tools.check_syntax("Timer")
//! local verdict = runtime.ai.verify("Timer")        -- { isCorrect, reasoning }
//! local review = runtime.ai.critique(goal, action)  -- { isOptimal, suggestion }
//! local g = runtime.call("physics", "gravity", {})
//! ```
//!
//! Registry and gateway failures are raised as Lua errors so an
//! implementation can `pcall` them.

use super::convert::{from_lua, to_lua};
use mlua::prelude::*;
use serde_json::Value;
use toolforge_application::RuntimeApi;
use toolforge_domain::{NewTool, Tool, ToolCall, ToolUpdate};

/// Build the `runtime` table bound to `api`.
pub(crate) fn register_runtime_api(lua: &Lua, api: RuntimeApi) -> LuaResult<LuaTable> {
    let runtime = lua.create_table()?;
    runtime.set("tools", tools_table(lua, &api)?)?;
    runtime.set("ai", ai_table(lua, &api)?)?;

    let rt = api.clone();
    runtime.set(
        "call",
        lua.create_async_function(move |lua, (namespace, method, args): (String, String, LuaValue)| {
            let rt = rt.clone();
            async move {
                let args = from_lua(&lua, args)?;
                let value = rt
                    .call(&namespace, &method, args)
                    .await
                    .map_err(|e| LuaError::runtime(e.message))?;
                to_lua(&lua, &value)
            }
        })?,
    )?;

    Ok(runtime)
}

fn tools_table(lua: &Lua, api: &RuntimeApi) -> LuaResult<LuaTable> {
    let tools = lua.create_table()?;

    let rt = api.clone();
    tools.set(
        "get",
        lua.create_function(move |lua, name: String| match rt.tools_get(&name) {
            Some(tool) => to_lua(lua, &tool),
            None => Ok(LuaValue::Nil),
        })?,
    )?;

    let rt = api.clone();
    tools.set(
        "list",
        lua.create_function(move |lua, ()| to_lua(lua, &rt.tools_list()))?,
    )?;

    let rt = api.clone();
    tools.set(
        "run",
        lua.create_async_function(move |lua, (name, args): (String, LuaValue)| {
            let rt = rt.clone();
            async move {
                let args = match from_lua(&lua, args)? {
                    Value::Null => Value::Object(Default::default()),
                    other => other,
                };
                let value = rt
                    .tools_run(&name, args)
                    .await
                    .map_err(|e| LuaError::runtime(e.message))?;
                to_lua(&lua, &value)
            }
        })?,
    )?;

    let rt = api.clone();
    tools.set(
        "add",
        lua.create_function(move |lua, payload: LuaValue| {
            let payload = NewTool::from_json(&from_lua(lua, payload)?)
                .map_err(|e| LuaError::runtime(e.to_string()))?;
            let tool = rt
                .tools_add(payload)
                .map_err(|e| LuaError::runtime(e.to_string()))?;
            to_lua(lua, &tool)
        })?,
    )?;

    let rt = api.clone();
    tools.set(
        "update",
        lua.create_function(move |lua, (name, fields): (String, LuaValue)| {
            let update = ToolUpdate::from_json(&from_lua(lua, fields)?)
                .map_err(|e| LuaError::runtime(e.to_string()))?;
            let tool = rt
                .tools_update(&name, update)
                .map_err(|e| LuaError::runtime(e.to_string()))?;
            to_lua(lua, &tool)
        })?,
    )?;

    let rt = api.clone();
    tools.set(
        "check_syntax",
        lua.create_function(move |_, name: String| match rt.check_syntax(&name) {
            Ok(()) => Ok((true, None::<String>)),
            Err(e) => Ok((false, Some(e.message))),
        })?,
    )?;

    Ok(tools)
}

fn ai_table(lua: &Lua, api: &RuntimeApi) -> LuaResult<LuaTable> {
    let ai = lua.create_table()?;

    let rt = api.clone();
    ai.set(
        "verify",
        lua.create_async_function(move |lua, target: LuaValue| {
            let rt = rt.clone();
            async move {
                let tool = resolve_tool(&rt, from_lua(&lua, target)?)?;
                let verdict = rt
                    .ai_verify(&tool)
                    .await
                    .map_err(|e| LuaError::runtime(e.to_string()))?;
                to_lua(&lua, &verdict)
            }
        })?,
    )?;

    let rt = api.clone();
    ai.set(
        "critique",
        lua.create_async_function(move |lua, (goal, action): (String, LuaValue)| {
            let rt = rt.clone();
            async move {
                let action: ToolCall = serde_json::from_value(from_lua(&lua, action)?)
                    .map_err(|e| LuaError::runtime(format!("invalid action: {}", e)))?;
                let review = rt
                    .ai_critique(&goal, &action)
                    .await
                    .map_err(|e| LuaError::runtime(e.to_string()))?;
                to_lua(&lua, &review)
            }
        })?,
    )?;

    Ok(ai)
}

/// Accept a tool name or a tool table (as returned by `tools.get`).
fn resolve_tool(api: &RuntimeApi, target: Value) -> LuaResult<Tool> {
    let name = match &target {
        Value::String(name) => Some(name.clone()),
        Value::Object(fields) => fields
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };
    let registered = name.as_deref().and_then(|n| api.tools_get(n));
    registered
        .or_else(|| serde_json::from_value(target).ok())
        .ok_or_else(|| match name {
            Some(name) => LuaError::runtime(format!("Tool not found: {}", name)),
            None => LuaError::runtime("expected a tool or a tool name"),
        })
}
