//! Lua execution sandbox
//!
//! Implements [`ExecutionSandbox`](toolforge_application::ExecutionSandbox)
//! on mlua (Lua 5.4).

mod convert;
mod lua_sandbox;
mod runtime_api;
mod shape;

pub use lua_sandbox::LuaSandbox;
