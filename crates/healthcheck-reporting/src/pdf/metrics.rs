//! Glyph widths for the two standard fonts the report uses, and greedy line
//! wrapping on top of them.
//!
//! Widths are the Adobe AFM advance widths in 1/1000 em. Characters outside
//! printable ASCII are measured as their unaccented base letter, which is
//! exact for the Latin-1 letters Spanish text needs.

use unicode_normalization::UnicodeNormalization;

use super::layout::Font;

const MM_PER_PT: f64 = 25.4 / 72.0;

/// Helvetica, code points 32..=126.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold, code points 32..=126.
#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

fn ascii_width(c: char, font: Font) -> Option<u16> {
    let idx = (c as u32).checked_sub(32)? as usize;
    let table = match font {
        Font::Regular => &HELVETICA,
        Font::Bold => &HELVETICA_BOLD,
    };
    table.get(idx).copied()
}

/// Advance width of one character in 1/1000 em.
pub fn char_width(c: char, font: Font) -> u16 {
    if let Some(w) = ascii_width(c, font) {
        return w;
    }
    match c {
        '•' => 350,
        '¿' => 611,
        '¡' => 333,
        '°' => 400,
        '–' => 556,
        '—' | '…' => 1000,
        '\u{a0}' => 278,
        // Drawn as two ASCII characters.
        '≥' | '≤' => 1168,
        '≠' => ascii_width('!', font).unwrap_or(278) + 584,
        '≈' => 584,
        '−' => 333,
        _ => c
            .nfd()
            .next()
            .and_then(|base| ascii_width(base, font))
            .unwrap_or(556),
    }
}

/// Width of `text` in millimetres at `size` points.
pub fn text_width(text: &str, size: f64, font: Font) -> f64 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(c, font))).sum();
    f64::from(units) / 1000.0 * size * MM_PER_PT
}

/// Wrap `text` into lines no wider than `max_width` millimetres.
///
/// Each `\n` starts a new line and blank lines are kept as empty strings.
/// Words are packed greedily; a single word wider than the line is broken
/// between characters.
pub fn split_text_to_size(text: &str, max_width: f64, size: f64, font: Font) -> Vec<String> {
    let fits = |s: &str| text_width(s, size, font) <= max_width;
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut any_word = false;

        for word in paragraph.split_whitespace() {
            any_word = true;
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if fits(&candidate) {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if fits(word) {
                current = word.to_string();
                continue;
            }
            for c in word.chars() {
                current.push(c);
                if !fits(&current) && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                }
            }
        }

        if !current.is_empty() || !any_word {
            lines.push(current);
        }
    }
    lines
}
