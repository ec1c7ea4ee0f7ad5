//! Text sink for generated code with indentation bookkeeping.

const INDENT: &str = "  ";

#[derive(Debug, Clone, Default)]
pub struct CodeWriter {
    buf: String,
    indent: usize,
    at_line_start: bool,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self { buf: String::new(), indent: 0, at_line_start: true }
    }

    /// A writer whose lines start at `level`. Used to render function-literal bodies
    /// into a string that is spliced into an enclosing line.
    pub fn with_indent(level: usize) -> Self {
        Self { buf: String::new(), indent: level, at_line_start: true }
    }

    pub fn level(&self) -> usize {
        self.indent
    }

    /// Leading whitespace of a line at the current level.
    pub fn padding(&self) -> String {
        INDENT.repeat(self.indent)
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.buf.push_str(INDENT);
        }
    }

    /// Append `s` to the current line, indenting first if the line is empty.
    /// Embedded newlines are copied verbatim: text produced by a nested writer is
    /// already indented.
    pub fn write(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        if self.at_line_start {
            self.write_indent();
        }
        self.buf.push_str(s);
        self.at_line_start = s.ends_with('\n');
    }

    pub fn write_line(&mut self, s: &str) {
        self.write(s);
        self.newline();
    }

    /// Append raw text with no indentation at all (runtime preambles, pre-rendered blocks).
    pub fn write_literally(&mut self, s: &str) {
        self.buf.push_str(s);
        self.at_line_start = s.ends_with('\n');
    }

    pub fn newline(&mut self) {
        self.buf.push('\n');
        self.at_line_start = true;
    }

    /// Emit a blank separator line unless the output is empty or already ends with one.
    pub fn blank_line(&mut self) {
        if !self.at_line_start {
            self.newline();
        }
        if self.buf.is_empty() || self.buf.ends_with("\n\n") || self.buf.ends_with("{\n") {
            return;
        }
        self.buf.push('\n');
    }

    /// `line {`, then indent.
    pub fn open_block(&mut self, line: &str) {
        if line.is_empty() {
            self.write_line("{");
        } else {
            self.write_line(&format!("{line} {{"));
        }
        self.indent();
    }

    /// Dedent, then `}` followed by `suffix`.
    pub fn close_block(&mut self, suffix: &str) {
        self.dedent();
        self.write_line(&format!("}}{suffix}"));
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn finish(self) -> String {
        self.buf
    }
}
