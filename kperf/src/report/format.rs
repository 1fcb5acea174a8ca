/// Digit-grouping formatter for counts, times and sizes.
///
/// Built once and handed to whatever renders numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    separator: char,
}

impl NumberFormat {
    /// Groups of three separated by `,` (`1,234,567`).
    pub fn english() -> Self {
        Self { separator: ',' }
    }

    pub fn int(&self, value: u64) -> String {
        let digits = value.to_string();
        let sep = self.separator;
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(sep);
            }
            out.push(c);
        }
        out
    }
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self::english()
    }
}
