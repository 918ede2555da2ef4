//! OCR text cleanup
//!
//! Heuristic fixes for the glyphs Tesseract most often confuses in printed
//! arithmetic, plus blank-line collapsing. Not a general correction pass.

/// Glyph substitutions applied to raw OCR output
const SUBSTITUTIONS: &[(char, char)] = &[
    // multiplication sign read as Latin X
    ('X', '×'),
    // plus sign read as CJK ten
    ('十', '+'),
];

/// Clean raw OCR text
///
/// Applies [`SUBSTITUTIONS`], then rewrites runs of line breaks: a single
/// empty line is dropped, and two or more consecutive empty lines shrink to
/// one. Lines holding only spaces are text, not empty. The result is trimmed.
///
/// # Examples
///
/// ```
/// use mathmap_server::ocr::normalize_ocr_text;
///
/// assert_eq!(normalize_ocr_text("3X4十1\n\n=?"), "3×4+1\n=?");
/// assert_eq!(normalize_ocr_text("3X4十1\n\n\n=?"), "3×4+1\n\n=?");
/// ```
pub fn normalize_ocr_text(raw: &str) -> String {
    let substituted: String = raw
        .chars()
        .map(|c| {
            SUBSTITUTIONS
                .iter()
                .find(|(from, _)| *from == c)
                .map_or(c, |(_, to)| *to)
        })
        .collect();

    let mut cleaned = String::with_capacity(substituted.len());
    let mut breaks = 0;
    for c in substituted.replace("\r\n", "\n").chars() {
        if c == '\n' {
            breaks += 1;
            continue;
        }
        push_line_breaks(&mut cleaned, breaks);
        breaks = 0;
        cleaned.push(c);
    }
    push_line_breaks(&mut cleaned, breaks);

    cleaned.trim().to_string()
}

/// Emit the collapsed form of a run of `count` line breaks
fn push_line_breaks(out: &mut String, count: usize) {
    match count {
        0 => {}
        1 | 2 => out.push('\n'),
        _ => out.push_str("\n\n"),
    }
}
