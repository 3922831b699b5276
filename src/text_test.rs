#![allow(clippy::float_cmp)]

use super::*;

/// One world unit per character, regardless of font size.
struct CharMeasure;

impl TextMeasure for CharMeasure {
    #[allow(clippy::cast_precision_loss)]
    fn text_width(&self, text: &str, _font_size: f64) -> f64 {
        text.chars().count() as f64
    }
}

// =============================================================
// wrap_lines
// =============================================================

#[test]
fn short_text_stays_on_one_line() {
    assert_eq!(wrap_lines("hello world", 20.0, 16.0, &CharMeasure), vec!["hello world"]);
}

#[test]
fn wraps_at_word_boundaries() {
    assert_eq!(wrap_lines("one two three", 8.0, 16.0, &CharMeasure), vec!["one two", "three"]);
}

#[test]
fn explicit_newlines_are_kept() {
    assert_eq!(wrap_lines("a\n\nb", 10.0, 16.0, &CharMeasure), vec!["a", "", "b"]);
}

#[test]
fn whitespace_runs_collapse() {
    assert_eq!(wrap_lines("a    b", 10.0, 16.0, &CharMeasure), vec!["a b"]);
}

#[test]
fn long_word_is_broken_between_characters() {
    assert_eq!(wrap_lines("abcdefgh", 3.0, 16.0, &CharMeasure), vec!["abc", "def", "gh"]);
}

#[test]
fn long_word_after_short_word() {
    assert_eq!(wrap_lines("hi abcdefg", 4.0, 16.0, &CharMeasure), vec!["hi", "abcd", "efg"]);
}

#[test]
fn empty_text_is_one_empty_line() {
    assert_eq!(wrap_lines("", 10.0, 16.0, &CharMeasure), vec![String::new()]);
}

// =============================================================
// ApproxMeasure
// =============================================================

#[test]
fn approx_measure_scales_with_font_size() {
    let m = ApproxMeasure::default();
    assert!((m.text_width("abcd", 10.0) - 24.0).abs() < 1e-9);
    assert!((m.text_width("abcd", 20.0) - 48.0).abs() < 1e-9);
}

// =============================================================
// fit_height
// =============================================================

#[test]
fn fit_height_grows_with_line_count() {
    let one = fit_height("abc", 100.0, 16.0, &CharMeasure);
    let two = fit_height("abc\ndef", 100.0, 16.0, &CharMeasure);
    assert_eq!(two - one, line_height(16.0));
}

#[test]
fn fit_height_reserves_one_line_for_empty_content() {
    let h = fit_height("", 100.0, 16.0, &CharMeasure);
    assert_eq!(h, (line_height(16.0) + TEXT_PADDING * 2.0).max(MIN_CARD_SIZE));
}

#[test]
fn fit_height_never_below_minimum() {
    assert!(fit_height("", 100.0, 8.0, &CharMeasure) >= MIN_CARD_SIZE);
}

#[test]
fn narrower_card_needs_more_height() {
    let text = "the quick brown fox jumps over the lazy dog";
    let wide = fit_height(text, 400.0, 16.0, &ApproxMeasure::default());
    let narrow = fit_height(text, 100.0, 16.0, &ApproxMeasure::default());
    assert!(narrow > wide);
}
