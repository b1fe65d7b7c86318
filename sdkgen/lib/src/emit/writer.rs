/// Line-oriented text builder with indentation tracking.
///
/// Blank lines never repeat and never open a file or follow an opening
/// brace, so emitters can call [`CodeWriter::blank`] freely between items.
#[derive(Debug, Clone)]
pub struct CodeWriter {
    buf: String,
    depth: usize,
    unit: &'static str,
}

impl CodeWriter {
    /// Indents with tabs, as gofmt does.
    pub fn tabs() -> Self {
        Self::with_unit("\t")
    }

    /// Indents with four spaces.
    pub fn spaces() -> Self {
        Self::with_unit("    ")
    }

    fn with_unit(unit: &'static str) -> Self {
        Self {
            buf: String::new(),
            depth: 0,
            unit,
        }
    }

    /// Appends one line at the current depth; empty text yields an empty line.
    pub fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.buf.push_str(self.unit);
            }
            self.buf.push_str(text);
        }
        self.buf.push('\n');
        self
    }

    /// Separates two items with a single empty line.
    pub fn blank(&mut self) -> &mut Self {
        let after_open = self.buf.ends_with("{\n") || self.buf.ends_with("(\n");
        if !self.buf.is_empty() && !self.buf.ends_with("\n\n") && !after_open {
            self.buf.push('\n');
        }
        self
    }

    /// Writes `text` and indents the following lines.
    pub fn open(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.line(text);
        self.depth += 1;
        self
    }

    /// Dedents and writes `text`, dropping an empty line left before it.
    pub fn close(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        while self.buf.ends_with("\n\n") {
            self.buf.pop();
        }
        self.line(text)
    }

    /// Writes rows with every column padded to its widest cell.
    ///
    /// Trailing empty cells are dropped and no line ends in whitespace.
    pub fn table(&mut self, rows: &[Vec<String>]) -> &mut Self {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0; columns];
        for row in rows {
            let used = used_cells(row);
            for (i, cell) in row.iter().take(used).enumerate() {
                // The last used cell never pads, so it does not widen its column.
                if i + 1 < used {
                    widths[i] = widths[i].max(cell.chars().count());
                }
            }
        }

        for row in rows {
            let used = used_cells(row);
            let mut text = String::new();
            for (i, cell) in row.iter().take(used).enumerate() {
                text.push_str(cell);
                if i + 1 < used {
                    let pad = widths[i] - cell.chars().count() + 1;
                    text.extend(std::iter::repeat_n(' ', pad));
                }
            }
            self.line(text);
        }
        self
    }

    /// The finished text, ending in exactly one newline.
    pub fn finish(mut self) -> String {
        while self.buf.ends_with("\n\n") {
            self.buf.pop();
        }
        if !self.buf.ends_with('\n') {
            self.buf.push('\n');
        }
        self.buf
    }
}

fn used_cells(row: &[String]) -> usize {
    row.iter().rposition(|cell| !cell.is_empty()).map_or(0, |i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(row: &[&str]) -> Vec<String> {
        row.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn nests_blocks_and_collapses_blank_lines() {
        let mut w = CodeWriter::tabs();
        w.blank();
        w.open("type A struct {");
        w.blank();
        w.line("ID int64");
        w.blank();
        w.close("}");
        w.blank().blank();
        w.line("const B = 1");

        assert_eq!(w.finish(), "type A struct {\n\tID int64\n}\n\nconst B = 1\n");
    }

    #[test]
    fn aligns_columns() {
        let mut w = CodeWriter::spaces();
        w.table(&[
            cells(&["ID", "int64", "`json:\"id\"`"]),
            cells(&["DisplayName", "string", ""]),
            cells(&["Tags", "[]string", "`json:\"tags\"`"]),
        ]);

        assert_eq!(
            w.finish(),
            "ID          int64    `json:\"id\"`\nDisplayName string\nTags        []string `json:\"tags\"`\n"
        );
    }
}
