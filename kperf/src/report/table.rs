use colored::{Color, Colorize};

/// Box-drawn text table with an optional background colour per row.
#[derive(Debug, Default)]
pub(crate) struct Table {
    headers: Vec<String>,
    rows: Vec<(Vec<String>, Option<Color>)>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(&mut self, cells: Vec<String>, color: Option<Color>) -> &mut Self {
        self.rows.push((cells, color));
        self
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for (cells, _) in &self.rows {
            for (i, cell) in cells.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let rule = |left: &str, mid: &str, right: &str| {
            let parts: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("{left}{}{right}\n", parts.join(mid))
        };

        let mut out = rule("┌", "┬", "┐");
        out.push_str(&line(&widths, &self.headers, |cell| cell.bold().to_string()));
        out.push_str(&rule("├", "┼", "┤"));
        for (cells, color) in &self.rows {
            out.push_str(&line(&widths, cells, |cell| match color {
                Some(c) => cell.on_color(*c).to_string(),
                None => cell.to_string(),
            }));
        }
        out.push_str(&rule("└", "┴", "┘"));
        out
    }
}

fn line(widths: &[usize], cells: &[String], paint: impl Fn(&str) -> String) -> String {
    let mut out = String::from("│");
    for (i, width) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let padded = format!(" {cell:<width$} ");
        out.push_str(&paint(&padded));
        out.push('│');
    }
    out.push('\n');
    out
}
