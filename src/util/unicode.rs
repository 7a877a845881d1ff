use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Terminal cells taken by `s`
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Cut `s` to at most `max_cells` cells on grapheme boundaries, ending in
/// `…` when anything was dropped.
pub fn truncate_to_width(s: &str, max_cells: usize) -> String {
    if display_width(s) <= max_cells {
        return s.to_string();
    }
    if max_cells == 0 {
        return String::new();
    }
    let budget = max_cells - 1;
    let mut width = 0;
    let mut out = String::new();
    for grapheme in s.graphemes(true) {
        let w = UnicodeWidthStr::width(grapheme);
        if width + w > budget {
            break;
        }
        width += w;
        out.push_str(grapheme);
    }
    out.push('\u{2026}');
    out
}

/// Right-pad with spaces to exactly `cells` cells, truncating first if needed.
pub fn fit_to_width(s: &str, cells: usize) -> String {
    let mut out = truncate_to_width(s, cells);
    let pad = cells.saturating_sub(display_width(&out));
    out.extend(std::iter::repeat_n(' ', pad));
    out
}
