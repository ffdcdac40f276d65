use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Widest entry, in terminal columns.
pub fn column_width<'a>(cells: impl IntoIterator<Item = &'a str>) -> usize {
    cells.into_iter().map(display_width).max().unwrap_or(0)
}

/// Left-align `s` in a column `width` columns wide.
pub fn pad_to_width(s: &str, width: usize) -> String {
    let padding = width.saturating_sub(display_width(s));
    format!("{s}{}", " ".repeat(padding))
}

/// Cut `s` so it fits in `width` columns, marking the cut with `…`.
pub fn truncate_to_width(s: &str, width: usize) -> String {
    if display_width(s) <= width {
        return s.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let budget = width - 1;
    let mut used = 0;
    let mut out = String::new();
    for c in s.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}
