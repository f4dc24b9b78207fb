//! Implementation shape detection.
//!
//! A tool implementation is either a function definition or a plain
//! statement sequence:
//!
//! ```lua
//! function add(a, b) return a + b end          -- named
//! local function greet(args) ... end           -- named, local
//! return function(args, runtime) ... end       -- anonymous
//! return args.a + args.b                       -- statements
//! ```
//!
//! For function shapes the declared parameter list decides how arguments
//! are passed (see [`Convention`]).

use regex::Regex;
use std::sync::LazyLock;

/// Leading blank lines and `--` line comments.
const PREAMBLE: &str = r"^(?:\s*--[^\n]*\n)*\s*";

static NAMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"{PREAMBLE}(?:local\s+)?function\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)"
    ))
    .expect("valid named function pattern")
});

static ANONYMOUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{PREAMBLE}return\s+function\s*\(([^)]*)\)"))
        .expect("valid anonymous function pattern")
});

/// Parameter names that receive the runtime handle.
const RUNTIME_LIKE: [&str; 5] = ["runtime", "rt", "api", "ctx", "context"];

pub(crate) fn is_runtime_like(param: &str) -> bool {
    RUNTIME_LIKE.contains(&param)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Shape {
    Named { name: String, params: Vec<String> },
    Anonymous { params: Vec<String> },
    Statements,
}

impl Shape {
    pub(crate) fn detect(source: &str) -> Self {
        if let Some(caps) = NAMED.captures(source) {
            return Shape::Named {
                name: caps[1].to_string(),
                params: split_params(&caps[2]),
            };
        }
        if let Some(caps) = ANONYMOUS.captures(source) {
            return Shape::Anonymous {
                params: split_params(&caps[1]),
            };
        }
        Shape::Statements
    }
}

/// How a detected function is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Convention {
    /// `f(args, runtime)`
    ArgsAndRuntime,
    /// `f(args)`
    ArgsOnly,
    /// `f(args[p1], args[p2], ...)`, runtime-like names get the runtime
    Positional(Vec<String>),
}

impl Convention {
    pub(crate) fn from_params(params: &[String]) -> Self {
        match params {
            [] => Convention::ArgsAndRuntime,
            _ if params.iter().any(|p| p == "...") => Convention::ArgsAndRuntime,
            [_] => Convention::ArgsOnly,
            [_, second] if is_runtime_like(second) => Convention::ArgsAndRuntime,
            _ => Convention::Positional(params.to_vec()),
        }
    }
}

fn split_params(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
