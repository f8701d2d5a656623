//! Structured text writer for the code generator.
//!
//! Lines are composed with [`Writer::begin_ln`]/[`Writer::end_ln`] so a
//! single output line can be assembled from several visits. The option stack
//! exists for exactly one consumer: the `for`-header, which emits its init
//! statement inline without indentation or a trailing newline.

use std::time::{SystemTime, UNIX_EPOCH};

use shx_ast::SourceArea;

#[derive(Debug, Clone, Copy)]
struct LineOptions {
    newline: bool,
    indent: bool,
}

const DEFAULT_OPTIONS: LineOptions = LineOptions {
    newline: true,
    indent: true,
};

#[derive(Debug)]
pub struct Writer {
    out: String,
    indent: String,
    indent_level: usize,
    options: Vec<LineOptions>,
    line_marks: bool,
    blanks: bool,
}

impl Writer {
    pub fn new(indent: &str, line_marks: bool, blanks: bool) -> Self {
        Self {
            out: String::new(),
            indent: indent.into(),
            indent_level: 0,
            options: Vec::new(),
            line_marks,
            blanks,
        }
    }

    fn current_options(&self) -> LineOptions {
        self.options.last().copied().unwrap_or(DEFAULT_OPTIONS)
    }

    /// Suppresses indentation and line breaks for nested statement visits.
    pub fn push_options(&mut self, newline: bool, indent: bool) {
        self.options.push(LineOptions { newline, indent });
    }

    pub fn pop_options(&mut self) {
        self.options.pop();
    }

    pub fn begin_ln(&mut self) {
        if self.current_options().indent {
            for _ in 0..self.indent_level {
                self.out.push_str(&self.indent);
            }
        }
    }

    pub fn end_ln(&mut self) {
        if self.current_options().newline {
            self.out.push('\n');
        }
    }

    pub fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    pub fn write_ln(&mut self, text: &str) {
        self.begin_ln();
        self.write(text);
        self.end_ln();
    }

    /// Emits an empty line, if blank lines are enabled.
    pub fn blank(&mut self) {
        if self.blanks {
            self.out.push('\n');
        }
    }

    pub fn inc_indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dec_indent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    pub fn open_scope(&mut self) {
        self.write_ln("{");
        self.inc_indent();
    }

    pub fn close_scope(&mut self, semicolon: bool) {
        self.dec_indent();
        self.write_ln(if semicolon { "};" } else { "}" });
    }

    /// Emits a `#line` marker for `area`, if line marks are enabled.
    pub fn line(&mut self, area: SourceArea) {
        if self.line_marks && area.is_valid() {
            self.begin_ln();
            self.write(&format!("#line {}", area.row));
            self.end_ln();
        }
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Formats a `SystemTime` as an ISO-8601 UTC timestamp
/// (`2017-01-29T12:00:00Z`).
pub fn iso8601_utc(time: SystemTime) -> String {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;
    let (hour, minute, second) = (rem / 3600, (rem % 3600) / 60, rem % 60);

    // Civil-from-days conversion for the proleptic Gregorian calendar.
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let year = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if month <= 2 { year + 1 } else { year };

    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z")
}
