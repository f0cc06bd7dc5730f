//! Source preparation before compilation.

use std::borrow::Cow;

pub use kiln_engine::wrap_module;

const LINE_TERMINATORS: [char; 4] = ['\n', '\r', '\u{2028}', '\u{2029}'];

/// Remove a leading `#!` interpreter line.
///
/// Only the line's content is removed; the line terminator stays so line
/// numbers in stack traces still match the file.
pub fn strip_shebang(source: &str) -> Cow<'_, str> {
    match source.strip_prefix("#!") {
        Some(rest) => {
            let end = rest.find(LINE_TERMINATORS).unwrap_or(rest.len());
            Cow::Borrowed(&rest[end..])
        }
        None => Cow::Borrowed(source),
    }
}

/// The exact string handed to the engine: shebang stripped, then optionally
/// wrapped as a CommonJS module function.
pub fn prepare_source(source: &str, compile_as_module: bool) -> Cow<'_, str> {
    let stripped = strip_shebang(source);
    if compile_as_module {
        Cow::Owned(wrap_module(&stripped))
    } else {
        stripped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_shebang_keeps_newline() {
        assert_eq!(
            strip_shebang("#!/usr/bin/env node\nconsole.log('hi')"),
            "\nconsole.log('hi')"
        );
    }

    #[test]
    fn test_strip_shebang_only_line() {
        assert_eq!(strip_shebang("#!/usr/bin/env node"), "");
    }

    #[test]
    fn test_strip_shebang_crlf() {
        assert_eq!(strip_shebang("#!node\r\n1"), "\r\n1");
    }

    #[test]
    fn test_no_shebang_untouched() {
        assert!(matches!(strip_shebang("1 + 1"), Cow::Borrowed("1 + 1")));
        assert_eq!(strip_shebang(" #!not-first"), " #!not-first");
    }

    #[test]
    fn test_only_first_line_stripped() {
        assert_eq!(strip_shebang("#!a\n#!b\n"), "\n#!b\n");
    }

    #[test]
    fn test_prepare_module() {
        assert_eq!(
            prepare_source("#!/bin/node\nmodule.exports = 42;", true),
            "(function (exports, require, module, __filename, __dirname) { \nmodule.exports = 42;\n});"
        );
    }
}
