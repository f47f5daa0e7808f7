//! Greedy word wrap shared by the plain-text and rich-text body paths.

use std::ops::Range;

/// One unbreakable unit of text, already measured in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measured {
    pub width: f32,
    /// Width of the space separating this word from the previous one.
    /// Zero for the first word of a paragraph.
    pub space_before: f32,
}

/// Packs words into lines no wider than `max_width`.
///
/// Returns one index range per line. A word that overflows an empty line
/// still occupies that line alone; words are never split.
pub fn greedy_break(words: &[Measured], max_width: f32) -> Vec<Range<usize>> {
    let mut lines = Vec::new();
    if words.is_empty() {
        return lines;
    }

    let mut start = 0;
    let mut current_width = 0.0_f32;

    for (i, word) in words.iter().enumerate() {
        if i == start {
            current_width = word.width;
            continue;
        }
        let candidate = current_width + word.space_before + word.width;
        if candidate > max_width {
            lines.push(start..i);
            start = i;
            current_width = word.width;
        } else {
            current_width = candidate;
        }
    }
    lines.push(start..words.len());
    lines
}

/// Wraps whitespace-separated text in a single face.
///
/// `measure` returns the rendered width of a string in points. Whitespace runs
/// collapse to single spaces. Empty input yields no lines.
pub fn wrap_text<F>(text: &str, max_width: f32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let words: Vec<&str> = text.split_whitespace().collect();
    let space = measure(" ");
    let measured: Vec<Measured> = words
        .iter()
        .map(|w| Measured {
            width: measure(w),
            space_before: space,
        })
        .collect();

    greedy_break(&measured, max_width)
        .into_iter()
        .map(|range| words[range].join(" "))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::font_metrics::BuiltinFace;

    /// One point per character, spaces included.
    fn monospace(s: &str) -> f32 {
        s.chars().count() as f32
    }

    #[test]
    fn test_empty_text_yields_no_lines() {
        assert!(wrap_text("", 100.0, monospace).is_empty());
        assert!(wrap_text("   \n\t ", 100.0, monospace).is_empty());
    }

    #[test]
    fn test_fits_on_one_line() {
        assert_eq!(wrap_text("ein kurzer Satz", 100.0, monospace), vec!["ein kurzer Satz"]);
    }

    #[test]
    fn test_breaks_before_overflowing_word() {
        let lines = wrap_text("aaaa bbbb cccc", 9.0, monospace);
        assert_eq!(lines, vec!["aaaa bbbb", "cccc"]);
    }

    #[test]
    fn test_exact_fit_stays_on_line() {
        let lines = wrap_text("aaaa bbbb", 9.0, monospace);
        assert_eq!(lines, vec!["aaaa bbbb"]);
    }

    #[test]
    fn test_overlong_word_sits_alone() {
        let lines = wrap_text("ab Donaudampfschifffahrt cd", 10.0, monospace);
        assert_eq!(lines, vec!["ab", "Donaudampfschifffahrt", "cd"]);
    }

    #[test]
    fn test_line_count_matches_total_width_over_usable_width() {
        // Three 4-point words plus two spaces fill 14 of 15 points, so every
        // line holds exactly three words and the greedy count is the ceiling.
        let usable = 15.0;
        for n in 1..40 {
            let text = vec!["abcd"; n].join(" ");
            let total = monospace(&text);
            let expected = (total / usable).ceil() as usize;
            assert_eq!(wrap_text(&text, usable, monospace).len(), expected, "n = {n}");
        }
    }

    #[test]
    fn test_rejoin_reproduces_word_sequence() {
        let text = "Mit großem Interesse habe ich Ihre Stellenausschreibung gelesen und \
                    bewerbe mich hiermit auf die ausgeschriebene Position in Ihrem Team.";
        let metrics = BuiltinFace::Helvetica.metrics();
        let lines = wrap_text(text, 120.0, |s| metrics.measure_str(s) * 11.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(!line.starts_with(' ') && !line.ends_with(' '));
        }
        let original: Vec<&str> = text.split_whitespace().collect();
        let rejoined = lines.join(" ");
        assert_eq!(rejoined.split(' ').collect::<Vec<_>>(), original);
    }

    #[test]
    fn test_zero_space_words_pack_tightly() {
        let words = [
            Measured { width: 4.0, space_before: 0.0 },
            Measured { width: 4.0, space_before: 0.0 },
            Measured { width: 4.0, space_before: 1.0 },
        ];
        assert_eq!(greedy_break(&words, 9.0), vec![0..2, 2..3]);
    }
}
