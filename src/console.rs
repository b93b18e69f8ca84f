//! Interactive Lua console.
//!
//! Input arrives in fragments, typically one line at a time. Fragments are
//! collected until they compile as a complete chunk, which is then run once.

use log::info;
use mlua::Lua;

/// Buffer of console input that has not yet formed a complete statement.
#[derive(Debug, Default)]
pub struct CommandConsole {
    buffer: String,
}

impl CommandConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment of input.
    ///
    /// Returns `false` while the buffered text is an unfinished statement and
    /// more input is needed. Returns `true` once the buffer has been consumed:
    /// executed (successfully or not) or thrown away because of a syntax error.
    pub fn execute(&mut self, lua: &Lua, fragment: &str) -> bool {
        if !self.buffer.is_empty() && !self.buffer.ends_with('\n') {
            self.buffer.push('\n');
        }
        self.buffer.push_str(fragment);

        let compiled = lua
            .load(self.buffer.as_str())
            .set_name("=console")
            .into_function();

        match compiled {
            Err(mlua::Error::SyntaxError {
                incomplete_input: true,
                ..
            }) => false,
            Err(err) => {
                self.buffer.clear();
                info!("[Console input] {err}");
                true
            }
            Ok(chunk) => {
                self.buffer.clear();
                if let Err(err) = chunk.call::<()>(()) {
                    info!("[Console input] {err}");
                }
                true
            }
        }
    }

    /// Text waiting for continuation, if any.
    pub fn pending(&self) -> Option<&str> {
        (!self.buffer.is_empty()).then_some(self.buffer.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(lua: &Lua) -> i64 {
        lua.globals().get::<i64>("counter").unwrap()
    }

    fn console_with_counter() -> (Lua, CommandConsole) {
        let lua = Lua::new();
        lua.globals().set("counter", 0).unwrap();
        (lua, CommandConsole::new())
    }

    #[test]
    fn complete_statement_runs_once() {
        let (lua, mut console) = console_with_counter();
        assert!(console.execute(&lua, "counter = counter + 1"));
        assert!(console.is_empty());
        assert_eq!(counter(&lua), 1);
    }

    #[test]
    fn unfinished_statement_waits_for_more() {
        let (lua, mut console) = console_with_counter();
        assert!(!console.execute(&lua, "if true then"));
        assert_eq!(console.pending(), Some("if true then"));
        assert_eq!(counter(&lua), 0);

        assert!(console.execute(&lua, "counter = counter + 1 end"));
        assert!(console.is_empty());
        assert_eq!(counter(&lua), 1);
    }

    #[test]
    fn multi_line_function_definition() {
        let (lua, mut console) = console_with_counter();
        assert!(!console.execute(&lua, "function bump(n)"));
        assert!(!console.execute(&lua, "  counter = counter + n"));
        assert!(console.execute(&lua, "end"));
        assert!(console.execute(&lua, "bump(5)"));
        assert_eq!(counter(&lua), 5);
    }

    #[test]
    fn syntax_error_is_discarded() {
        let (lua, mut console) = console_with_counter();
        assert!(console.execute(&lua, ")"));
        assert!(console.is_empty());
        assert_eq!(console.pending(), None);

        // buffer really was cleared: a fresh statement compiles on its own
        assert!(console.execute(&lua, "counter = 3"));
        assert_eq!(counter(&lua), 3);
    }

    #[test]
    fn syntax_error_after_continuation_clears_buffer() {
        let (lua, mut console) = console_with_counter();
        assert!(!console.execute(&lua, "if true then"));
        assert!(console.execute(&lua, "counter = = 2 end"));
        assert!(console.is_empty());
        assert_eq!(counter(&lua), 0);
    }

    #[test]
    fn runtime_error_is_consumed() {
        let (lua, mut console) = console_with_counter();
        assert!(console.execute(&lua, "counter = counter + 1; error('boom')"));
        assert!(console.is_empty());
        // side effects before the error stay
        assert_eq!(counter(&lua), 1);
        assert!(console.execute(&lua, "counter = counter + 1"));
        assert_eq!(counter(&lua), 2);
    }

    #[test]
    fn return_values_are_discarded() {
        let (lua, mut console) = console_with_counter();
        assert!(console.execute(&lua, "return 1, 2, 3"));
        assert!(console.is_empty());
    }
}
