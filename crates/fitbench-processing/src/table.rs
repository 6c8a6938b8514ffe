//! Console text tables.
//!
//! Tables are drawn with centred cells, a `=` rule under the header and a
//! `-` rule between rows:
//!
//! ```text
//! +--------+-------+
//! | Column | Count |
//! +========+=======+
//! |  Age   |   1   |
//! +--------+-------+
//! ```
//!
//! Cells wider than the available width are word wrapped.

/// Width of the console the tables are laid out for.
pub const CONSOLE_WIDTH: usize = 120;

/// Placeholder for empty cells and empty tables.
pub const NOT_APPLICABLE: &str = "N / A";

/// A table with a header row.
#[derive(Debug, Clone)]
pub struct TextTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    max_width: usize,
}

impl TextTable {
    pub fn new<S: Into<String>>(header: impl IntoIterator<Item = S>) -> Self {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            max_width: CONSOLE_WIDTH,
        }
    }

    /// Set the maximum total width, borders included.
    pub fn with_max_width(mut self, max_width: usize) -> Self {
        self.max_width = max_width;
        self
    }

    pub fn add_row<S: Into<String>>(&mut self, row: impl IntoIterator<Item = S>) {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn add_rows(&mut self, rows: Vec<Vec<String>>) {
        self.rows.extend(rows);
    }

    /// Render the table.
    pub fn draw(&self) -> String {
        let n_cols = self.header.len();
        if n_cols == 0 {
            return String::new();
        }

        let widths = self.column_widths();
        let border = rule(&widths, '-');
        let mut out = String::new();

        out.push_str(&border);
        out.push('\n');
        push_row(&mut out, &self.header, &widths);
        out.push_str(&rule(&widths, '='));
        out.push('\n');

        for row in &self.rows {
            push_row(&mut out, row, &widths);
            out.push_str(&border);
            out.push('\n');
        }

        if self.rows.is_empty() {
            // no body: a plain border closes the header
            out.truncate(out.len() - 1);
            let len = out.len();
            out.truncate(len - border.len());
            out.push_str(&border);
        } else {
            out.pop();
        }
        out
    }

    /// Content widths, shrunk until the table fits `max_width`.
    fn column_widths(&self) -> Vec<usize> {
        let n_cols = self.header.len();
        let mut widths = vec![1usize; n_cols];
        for row in std::iter::once(&self.header).chain(self.rows.iter()) {
            for (col, cell) in row.iter().enumerate().take(n_cols) {
                let longest = cell.lines().map(|line| line.chars().count()).max().unwrap_or(0);
                widths[col] = widths[col].max(longest);
            }
        }

        let decoration = 3 * n_cols + 1;
        let limit = self.max_width.saturating_sub(decoration).max(n_cols);
        while widths.iter().sum::<usize>() > limit {
            let (widest, _) = widths
                .iter()
                .enumerate()
                .max_by_key(|(col, width)| (**width, std::cmp::Reverse(*col)))
                .unwrap_or((0, &1));
            if widths[widest] <= 1 {
                break;
            }
            widths[widest] -= 1;
        }
        widths
    }
}

/// Insert one `N / A` row when `rows` is empty.
pub fn fill_empty(rows: &mut Vec<Vec<String>>, n_cols: usize) {
    if rows.is_empty() {
        rows.push(vec![NOT_APPLICABLE.to_string(); n_cols]);
    }
}

/// A full width `=` banner, optionally holding a centred title.
pub fn horizontal_rule(title: Option<&str>) -> String {
    match title {
        None => format!("\n+{}+\n", "=".repeat(CONSOLE_WIDTH - 2)),
        Some(title) => {
            let side = CONSOLE_WIDTH.saturating_sub(6 + title.chars().count()) / 2;
            let semi = format!("+{}+", "=".repeat(side));
            format!("{} {} {}\n", semi, title, semi)
        }
    }
}

fn rule(widths: &[usize], fill: char) -> String {
    let mut line = String::from("+");
    for width in widths {
        line.extend(std::iter::repeat_n(fill, width + 2));
        line.push('+');
    }
    line
}

fn push_row(out: &mut String, row: &[String], widths: &[usize]) {
    let cells: Vec<Vec<String>> = widths
        .iter()
        .enumerate()
        .map(|(col, &width)| wrap(row.get(col).map(String::as_str).unwrap_or(""), width))
        .collect();
    let height = cells.iter().map(Vec::len).max().unwrap_or(1);

    for line_idx in 0..height {
        out.push('|');
        for (cell, &width) in cells.iter().zip(widths) {
            // vertically centred
            let top = (height - cell.len()) / 2;
            let text = line_idx
                .checked_sub(top)
                .and_then(|i| cell.get(i))
                .map(String::as_str)
                .unwrap_or("");
            out.push(' ');
            out.push_str(&center(text, width));
            out.push_str(" |");
        }
        out.push('\n');
    }
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    let padding = width.saturating_sub(len);
    let left = padding / 2;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(padding - left))
}

/// Greedy word wrap; words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                lines.push(word.drain(..width).collect());
            }
            if word.is_empty() {
                continue;
            }
            let current_len = current.chars().count();
            if current_len > 0 && current_len + 1 + word.len() > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.extend(word);
        }
        lines.push(current);
    }
    lines
}
