//! Text layout for text cards: word wrapping and auto-height.
//!
//! Measurement is abstracted behind [`TextMeasure`] so layout runs the same
//! in tests (with [`ApproxMeasure`]) and in the browser (with a measurer
//! backed by the canvas context).

#[cfg(test)]
#[path = "text_test.rs"]
mod text_test;

use crate::consts::{LINE_HEIGHT_RATIO, MIN_CARD_SIZE, TEXT_PADDING};

/// Measures the advance width of a run of text at a given font size.
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_size: f64) -> f64;
}

/// Fixed-advance approximation: every character is `ratio * font_size` wide.
#[derive(Debug, Clone, Copy)]
pub struct ApproxMeasure {
    pub ratio: f64,
}

impl Default for ApproxMeasure {
    fn default() -> Self {
        Self { ratio: 0.6 }
    }
}

impl TextMeasure for ApproxMeasure {
    #[allow(clippy::cast_precision_loss)]
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        text.chars().count() as f64 * font_size * self.ratio
    }
}

/// Line advance for a font size.
#[must_use]
pub fn line_height(font_size: f64) -> f64 {
    font_size * LINE_HEIGHT_RATIO
}

/// Wrap `text` into lines no wider than `max_w`.
///
/// Explicit newlines are kept, runs of whitespace collapse to one space, and
/// words wider than `max_w` are broken between characters.
#[must_use]
pub fn wrap_lines(text: &str, max_w: f64, font_size: f64, measure: &dyn TextMeasure) -> Vec<String> {
    let fits = |s: &str| measure.text_width(s, font_size) <= max_w;
    let mut out = Vec::new();
    for raw_line in text.split('\n') {
        let words: Vec<&str> = raw_line.split_whitespace().collect();
        if words.is_empty() {
            out.push(String::new());
            continue;
        }

        let mut current = String::new();
        for word in words {
            if !current.is_empty() {
                let candidate = format!("{current} {word}");
                if fits(&candidate) {
                    current = candidate;
                    continue;
                }
                out.push(std::mem::take(&mut current));
            }
            if fits(word) {
                current = word.to_owned();
            } else {
                let mut chunks = break_long_word(word, max_w, font_size, measure);
                current = chunks.pop().unwrap_or_default();
                out.extend(chunks);
            }
        }
        out.push(current);
    }
    out
}

fn break_long_word(word: &str, max_w: f64, font_size: f64, measure: &dyn TextMeasure) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for ch in word.chars() {
        let mut candidate = current.clone();
        candidate.push(ch);
        if !current.is_empty() && measure.text_width(&candidate, font_size) > max_w {
            lines.push(current);
            current = ch.to_string();
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Card height that fits `content` wrapped inside a card of `card_width`.
///
/// An empty string still reserves one line. The result never drops below
/// [`MIN_CARD_SIZE`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn fit_height(content: &str, card_width: f64, font_size: f64, measure: &dyn TextMeasure) -> f64 {
    let inner_w = (card_width - TEXT_PADDING * 2.0).max(1.0);
    let lines = wrap_lines(content, inner_w, font_size, measure).len().max(1);
    let height = lines as f64 * line_height(font_size) + TEXT_PADDING * 2.0;
    height.max(MIN_CARD_SIZE)
}
