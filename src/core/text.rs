//! Helvetica metrics and fitting for text drawn with the standard Type1 font.
//!
//! Widths are the AFM advance widths in 1/1000 em for the printable ASCII range;
//! anything outside it is measured with the digit width.

const HELVETICA_ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const DEFAULT_WIDTH: u16 = 556;

pub fn char_width(ch: char) -> u16 {
    let code = ch as u32;
    if (0x20..=0x7e).contains(&code) {
        HELVETICA_ASCII_WIDTHS[(code - 0x20) as usize]
    } else {
        DEFAULT_WIDTH
    }
}

pub fn text_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = text.chars().map(|ch| char_width(ch) as u32).sum();
    units as f32 * font_size / 1000.0
}

/// Longest prefix of `text` that fits within `max_width`.
pub fn truncate_to_width(text: &str, font_size: f32, max_width: f32) -> String {
    let mut width = 0.0;
    let mut fitted = String::new();
    for ch in text.chars() {
        width += char_width(ch) as f32 * font_size / 1000.0;
        if width > max_width {
            break;
        }
        fitted.push(ch);
    }
    fitted.trim_end().to_string()
}

/// Greedy word wrap; words wider than a whole line are broken by character.
pub fn wrap_to_width(text: &str, font_size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };

        if text_width(&candidate, font_size) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        let mut rest = word.to_string();
        while text_width(&rest, font_size) > max_width {
            let head = truncate_to_width(&rest, font_size, max_width);
            if head.is_empty() {
                // Not even one character fits; emit it anyway so wrapping terminates.
                let mut chars = rest.chars();
                let first = chars.next().map(String::from).unwrap_or_default();
                lines.push(first);
                rest = chars.collect();
            } else {
                rest = rest[head.len()..].to_string();
                lines.push(head);
            }
        }
        current = rest;
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Maps text onto WinAnsiEncoding bytes; unmappable characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => ch as u32 as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}
