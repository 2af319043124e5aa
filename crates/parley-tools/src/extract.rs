//! Tool call extraction from free text.
//!
//! The grammar is intentionally flat: `name(arg1, arg2, ...)` where `name`
//! is an identifier and the argument list runs up to the first closing
//! parenthesis. There is no nesting and no quoting, so an argument can never
//! contain `,` or `)`. Hosts that need richer syntax should supply their own
//! [`ToolCallParser`].

use once_cell::sync::Lazy;
use parley_core::ToolCall;
use regex::Regex;

static TOOL_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\(([^)]*)\)").expect("tool call pattern is valid")
});

/// Strategy for turning raw input into tool calls.
pub trait ToolCallParser: Send + Sync {
    /// Return every call found in `input`, left to right.
    fn parse(&self, input: &str) -> Vec<ToolCall>;
}

/// The default flat `name(args)` parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternParser;

impl ToolCallParser for PatternParser {
    fn parse(&self, input: &str) -> Vec<ToolCall> {
        extract_tool_calls(input)
    }
}

/// Extract all `name(args)` calls from `input` in order of appearance.
///
/// Arguments are split on `,`, trimmed, and empty ones are dropped, so
/// `f()`, `f( )` and `f(a,)` yield zero, zero and one argument respectively.
/// Text that does not match is ignored.
///
/// ```rust
/// use parley_tools::extract_tool_calls;
///
/// let calls = extract_tool_calls("please echo(foo, bar) then ping()");
/// assert_eq!(calls.len(), 2);
/// assert_eq!(calls[0].name, "echo");
/// assert_eq!(calls[0].args, vec!["foo", "bar"]);
/// assert!(calls[1].args.is_empty());
/// ```
pub fn extract_tool_calls(input: &str) -> Vec<ToolCall> {
    TOOL_CALL_RE
        .captures_iter(input)
        .map(|caps| {
            let args = caps[2]
                .split(',')
                .map(str::trim)
                .filter(|arg| !arg.is_empty())
                .map(str::to_string)
                .collect();
            ToolCall::new(&caps[1], args)
        })
        .collect()
}
