use crate::types::Settings;
use serde::Serialize;
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteUnit {
    Lines(Vec<String>),
    Pause,
    HardBreak, // pause, then clear
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineBreakInfo {
    pub wrapped_lines: Vec<usize>,
    pub screen_breaks: Vec<usize>,
}

/// Greedy word wrap on single spaces. A word longer than `width` is cut to
/// `width` characters. Never returns an empty vec.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split(' ') {
        let word_len = word.chars().count();
        if current_len + word_len + 1 <= width {
            if !current.is_empty() {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(word);
            current_len += word_len;
        } else {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current = word.chars().take(width).collect();
            current_len = word_len.min(width);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Splits note text into screens (3+ line breaks), pause groups (2 line
/// breaks) and wrapped lines. Screen overflow inside a group is left to the
/// renderer.
pub fn paginate(text: &str, width: usize) -> Vec<NoteUnit> {
    let text = normalize_newlines(text);
    let mut units = Vec::new();

    for (i, screen) in split_hard_breaks(&text).into_iter().enumerate() {
        if i > 0 {
            units.push(NoteUnit::HardBreak);
        }
        for (j, group) in screen.split("\n\n").enumerate() {
            if j > 0 {
                units.push(NoteUnit::Pause);
            }
            let mut lines = Vec::new();
            for line in group.split('\n') {
                if line.trim().is_empty() {
                    lines.push(String::new());
                } else {
                    lines.extend(wrap(line, width));
                }
            }
            units.push(NoteUnit::Lines(lines));
        }
    }

    units
}

/// Editor hints for a note: content lines that wrap, and lines after which
/// the screen fills up and an automatic pause is inserted.
pub fn line_break_info(content: &str, settings: &Settings) -> LineBreakInfo {
    let text = normalize_newlines(content);
    let mut info = LineBreakInfo::default();
    let mut visible = 0;

    for (idx, line) in text.split('\n').enumerate() {
        if line.is_empty() {
            // part of a pause or hard break
            visible = 0;
            continue;
        }
        let wrapped = if line.trim().is_empty() {
            1
        } else {
            wrap(line, settings.chars_per_line).len()
        };
        if wrapped > 1 {
            info.wrapped_lines.push(idx);
        }
        visible += wrapped;
        if visible >= settings.lines_per_screen {
            info.screen_breaks.push(idx);
            visible = 0;
        }
    }

    info
}

pub(crate) fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

fn split_hard_breaks(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\n' {
            i += 1;
            continue;
        }
        let run_start = i;
        while i < bytes.len() && bytes[i] == b'\n' {
            i += 1;
        }
        if i - run_start >= 3 {
            out.push(&text[start..run_start]);
            start = i;
        }
    }
    out.push(&text[start..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lines(items: &[&str]) -> NoteUnit {
        NoteUnit::Lines(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn wraps_greedily() {
        assert_eq!(
            wrap("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
    }

    #[test]
    fn truncates_long_words() {
        assert_eq!(wrap("abcdefghij xy", 4), vec!["abcd", "xy"]);
    }

    #[test]
    fn empty_input_is_one_empty_line() {
        assert_eq!(wrap("", 26), vec![String::new()]);
    }

    #[test]
    fn splits_screens_and_pause_groups() {
        assert_eq!(
            paginate("Hi\n\n\nBye", 26),
            vec![lines(&["Hi"]), NoteUnit::HardBreak, lines(&["Bye"])]
        );
        assert_eq!(
            paginate("one\ntwo\n\nthree", 26),
            vec![lines(&["one", "two"]), NoteUnit::Pause, lines(&["three"])]
        );
    }

    #[test]
    fn long_break_runs_count_as_one_hard_break() {
        assert_eq!(
            paginate("a\n\n\n\n\nb", 26),
            vec![lines(&["a"]), NoteUnit::HardBreak, lines(&["b"])]
        );
    }

    #[test]
    fn blank_lines_are_kept_unwrapped() {
        assert_eq!(paginate("a\n  \nb", 26), vec![lines(&["a", "", "b"])]);
    }

    #[test]
    fn carriage_returns_are_normalised() {
        assert_eq!(
            paginate("a\r\n\r\nb", 26),
            vec![lines(&["a"]), NoteUnit::Pause, lines(&["b"])]
        );
    }

    #[test]
    fn wrapped_lines_feed_the_unit() {
        assert_eq!(
            paginate("aaa bbb ccc", 7),
            vec![lines(&["aaa bbb", "ccc"])]
        );
    }

    #[test]
    fn reports_wraps_and_screen_breaks() {
        let settings = Settings {
            chars_per_line: 5,
            lines_per_screen: 3,
            max_items_per_menu: 8,
        };
        let info = line_break_info("aa\nbbb ccc\nd\ne\n\nf", &settings);
        assert_eq!(info.wrapped_lines, vec![1]);
        // "aa" + two wrapped lines reach the limit on line 1
        assert_eq!(info.screen_breaks, vec![1]);
    }

    proptest! {
        #[test]
        fn wrapped_lines_fit_width(text in "[a-z ]{0,80}", width in 1usize..30) {
            for line in wrap(&text, width) {
                prop_assert!(line.chars().count() <= width);
            }
        }

        #[test]
        fn rewrapping_joined_output_is_stable(
            words in proptest::collection::vec("[a-z]{1,8}", 1..20),
            width in 8usize..30,
        ) {
            let text = words.join(" ");
            let once = wrap(&text, width);
            let twice = wrap(&once.join(" "), width);
            prop_assert_eq!(once, twice);
        }
    }
}
