//! Glyph advance widths for the standard fonts, in thousandths of an em.

use super::style::StandardFont;

/// Helvetica advance widths for the printable ASCII range `0x20..=0x7e`.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const COURIER_WIDTH: u16 = 600;
const FALLBACK_WIDTH: u16 = 556;

fn glyph_width(font: StandardFont, byte: u8) -> u16 {
    if font.is_monospaced() {
        return COURIER_WIDTH;
    }
    match byte {
        0x20..=0x7e => HELVETICA_ASCII[usize::from(byte - 0x20)],
        _ => FALLBACK_WIDTH,
    }
}

/// Width in points of WinAnsi-encoded `text` set in `font` at `points`.
///
/// Courier is exact. Every other font is measured with Helvetica metrics, which is close
/// enough to centre a short line of text.
pub fn text_width(font: StandardFont, text: &[u8], points: f64) -> f64 {
    let units: u32 = text.iter().map(|b| u32::from(glyph_width(font, *b))).sum();
    f64::from(units) * points / 1000.0
}

/// Encodes `text` for a simple font using WinAnsiEncoding.
///
/// Printable ASCII and the Latin-1 supplement map onto themselves; anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            code @ (0x20..=0x7e | 0xa0..=0xff) => code as u8,
            _ => b'?',
        })
        .collect()
}
