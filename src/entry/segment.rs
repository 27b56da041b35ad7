use std::iter::Peekable;

use regex::{Match, Matches};

use super::Grammar;

/// The text of one log entry within a file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RawEntrySpan<'text> {
    /// The byte offset of the entry within the file.
    pub offset: usize,

    /// The entry's text, including any line terminator before the next entry.
    pub text: &'text str,
}

/// An iterator over the entries of a file, created by [`Grammar::segment`].
#[derive(Debug)]
pub struct Segments<'grammar, 'text> {
    text: &'text str,
    starts: Peekable<Matches<'grammar, 'text>>,
}

impl Grammar {
    /// Split `text` into entries.
    ///
    /// Every line that starts with `<timestamp> <timezone> ` begins a new entry, which runs until
    /// the next such line or the end of `text`. Any text before the first entry is dropped, and a
    /// file without any entry start yields nothing.
    #[must_use]
    pub fn segment<'grammar, 'text>(&'grammar self, text: &'text str) -> Segments<'grammar, 'text> {
        Segments {
            text,
            starts: self.entry_start.find_iter(text).peekable(),
        }
    }
}

impl<'text> Iterator for Segments<'_, 'text> {
    type Item = RawEntrySpan<'text>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.starts.next()?.start();
        let end = self.starts.peek().map_or(self.text.len(), Match::start);

        Some(RawEntrySpan {
            offset: start,
            text: &self.text[start..end],
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::entry::{segment, RawEntrySpan};

    fn texts(text: &str) -> Vec<&str> {
        segment(text).map(|span| span.text).collect()
    }

    #[test]
    fn segment_single_line() {
        assert_eq!(
            segment("2018-01-01 00:00:00 CEST a u d 1.1 LOG:  first").collect::<Vec<_>>(),
            vec![RawEntrySpan {
                offset: 0,
                text: "2018-01-01 00:00:00 CEST a u d 1.1 LOG:  first",
            }]
        );
    }

    #[test]
    fn segment_two_entries() {
        let text = "2018-01-01 00:00:00 CEST a u d 1.1 LOG:  first\n\
                    2018-01-01 00:00:01 CEST a u d 1.2 LOG:  second";

        let spans = segment(text).collect::<Vec<_>>();
        assert_eq!(spans.len(), 2);
        assert_eq!(
            spans[0].text,
            "2018-01-01 00:00:00 CEST a u d 1.1 LOG:  first\n"
        );
        assert_eq!(spans[1].offset, spans[0].text.len());
        assert_eq!(
            spans[1].text,
            "2018-01-01 00:00:01 CEST a u d 1.2 LOG:  second"
        );
    }

    #[test]
    fn segment_keeps_continuation_lines() {
        let text = "2018-01-01 00:00:00 CEST a u d 1.1 STATEMENT:  CREATE TABLE t (\n\
                    \tid integer\n\
                    );\n\
                    2018-01-01 00:00:01 CEST a u d 1.1 LOG:  done\n";

        assert_eq!(
            texts(text),
            vec![
                "2018-01-01 00:00:00 CEST a u d 1.1 STATEMENT:  CREATE TABLE t (\n\tid integer\n);\n",
                "2018-01-01 00:00:01 CEST a u d 1.1 LOG:  done\n",
            ]
        );
    }

    #[test]
    fn segment_drops_leading_text() {
        let text = "log rotated\n2018-01-01 00:00:00 CEST a u d 1.1 LOG:  first\n";

        let spans = segment(text).collect::<Vec<_>>();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].offset, "log rotated\n".len());
        assert_eq!(spans[0].text, "2018-01-01 00:00:00 CEST a u d 1.1 LOG:  first\n");
    }

    #[test]
    fn segment_ignores_timestamps_mid_line() {
        let text = "2018-01-01 00:00:00 CEST a u d 1.1 LOG:  seen at 2018-01-01 00:00:00 CEST ago";
        assert_eq!(texts(text), vec![text]);
    }

    #[test]
    fn segment_ignores_other_timezones() {
        let text = "2018-01-01 00:00:00 CEST a u d 1.1 LOG:  first\n\
                    2018-01-01 00:00:01 UTC a u d 1.1 LOG:  second\n";
        assert_eq!(texts(text), vec![text]);
    }

    #[test]
    fn segment_no_entries() {
        assert_eq!(texts(""), Vec::<&str>::new());
        assert_eq!(texts("garbage line, no timestamp at all\n"), Vec::<&str>::new());
        assert_eq!(texts("2018-01-01 00:00:00 CEST"), Vec::<&str>::new());
    }

    #[test]
    fn segment_spans_are_contiguous() {
        let text = "preamble\n\
                    2018-01-01 00:00:00 CEST a u d 1.1 LOG:  one\n\
                    2018-01-01 00:00:01 CEST a u d 1.1 ERROR:  two\n\
                    \tcontinued\n\
                    2018-01-01 00:00:02 CEST three";

        let spans = segment(text).collect::<Vec<_>>();
        assert_eq!(spans.len(), 3);

        let mut expected_offset = spans[0].offset;
        for span in &spans {
            assert_eq!(span.offset, expected_offset);
            assert_eq!(&text[span.offset..span.offset + span.text.len()], span.text);
            expected_offset += span.text.len();
        }
        assert_eq!(expected_offset, text.len());
    }

    #[test]
    fn segment_with_custom_timezone() -> crate::test::Result {
        let grammar = crate::entry::Grammar::new("UTC")?;
        let text = "2018-01-01 00:00:00 UTC one\n2018-01-01 00:00:01 UTC two";

        assert_eq!(grammar.segment(text).count(), 2);
        assert_eq!(segment(text).count(), 0);

        Ok(())
    }
}
