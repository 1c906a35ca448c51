//! Indented line buffer for generated C++

#[derive(Debug, Clone)]
pub struct CppEmitter {
    code: String,
    level: usize,
    width: usize,
}

impl CppEmitter {
    pub fn new(width: usize) -> Self {
        Self {
            code: String::new(),
            level: 0,
            width,
        }
    }

    pub fn with_level(width: usize, level: usize) -> Self {
        Self {
            code: String::new(),
            level,
            width,
        }
    }

    pub fn emit_line(&mut self, line: &str) {
        if line.is_empty() {
            self.code.push('\n');
            return;
        }
        self.code.push_str(&" ".repeat(self.level * self.width));
        self.code.push_str(line);
        self.code.push('\n');
    }

    /// Labels sit one level left of the statements they precede
    pub fn emit_label(&mut self, label: &str) {
        let level = self.level.saturating_sub(1);
        self.code.push_str(&" ".repeat(level * self.width));
        self.code.push_str(label);
        self.code.push_str(":;\n");
    }

    /// Append pre-rendered text as is
    pub fn emit_raw(&mut self, text: &str) {
        self.code.push_str(text);
    }

    pub fn indent(&mut self) {
        self.level += 1;
    }

    pub fn dedent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Current indentation as text
    pub fn padding(&self) -> String {
        " ".repeat(self.level * self.width)
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn finish(self) -> String {
        self.code
    }
}
