/// One word of a command line, with its byte span in the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    /// Word text with quotes removed.
    pub text: String,
    /// Byte offset of the first character (including an opening quote).
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

/// A command line split into words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    /// The words, in order.
    pub words: Vec<Word>,
    /// Whether the line ends in whitespace (the last word is complete).
    pub trailing_space: bool,
}

impl Line {
    /// The word texts, cloned.
    pub fn texts(&self) -> Vec<String> {
        self.words.iter().map(|w| w.text.clone()).collect()
    }
}

/// A quoted word with no closing quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnterminatedQuote {
    /// Byte offset of the opening quote.
    pub start: usize,
}

/// Split a command line into words.
///
/// Words are separated by whitespace. A run of text inside `"..."` or
/// `'...'` is taken literally, whitespace included; quotes may appear in
/// the middle of a word (`name="a b"` is one word, `name=a b`).
pub fn split_words(line: &str) -> Result<Line, UnterminatedQuote> {
    let mut words = Vec::new();
    let mut chars = line.char_indices().peekable();
    let mut current: Option<(usize, String)> = None;

    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() {
            if let Some((start, text)) = current.take() {
                words.push(Word { text, start, end: i });
            }
            continue;
        }
        let (_, text) = current.get_or_insert_with(|| (i, String::new()));
        if c == '"' || c == '\'' {
            let mut closed = false;
            for (_, q) in chars.by_ref() {
                if q == c {
                    closed = true;
                    break;
                }
                text.push(q);
            }
            if !closed {
                return Err(UnterminatedQuote { start: i });
            }
        } else {
            text.push(c);
        }
    }
    if let Some((start, text)) = current.take() {
        words.push(Word {
            text,
            start,
            end: line.len(),
        });
    }

    let trailing_space = line.chars().last().is_some_and(char::is_whitespace);
    Ok(Line {
        words,
        trailing_space,
    })
}

/// Split a partial line for completion: the completed words, and the
/// (possibly empty) word being typed.
///
/// An unterminated quote is treated as an open word running to the end of
/// the line, so `name "a b` completes the word `a b`.
pub fn split_for_completion(line: &str) -> (Vec<String>, String) {
    let parsed = match split_words(line) {
        Ok(parsed) => parsed,
        Err(UnterminatedQuote { start }) => {
            let mut head = split_words(&line[..start]).unwrap_or_default();
            let open = &line[start + 1..];
            // `name="a b` keeps the text before the quote in the same word.
            let prefix = if head.trailing_space || head.words.is_empty() {
                String::new()
            } else if head.words.last().is_some_and(|w| w.end == start) {
                head.words.pop().map(|w| w.text).unwrap_or_default()
            } else {
                String::new()
            };
            return (head.texts(), format!("{prefix}{open}"));
        }
    };
    let mut words = parsed.texts();
    if parsed.trailing_space || words.is_empty() {
        return (words, String::new());
    }
    let text = words.pop().unwrap_or_default();
    (words, text)
}

/// Remove a leading `no` (case-insensitive, whole word) from `words`.
///
/// Returns whether the line is a `no` command, and the remaining words.
pub fn strip_no(words: &[String]) -> (bool, &[String]) {
    match words.split_first() {
        Some((first, rest)) if first.eq_ignore_ascii_case("no") => (true, rest),
        _ => (false, words),
    }
}

/// Case-insensitive prefix test used for keywords and command names.
pub fn is_prefix_of(word: &str, token: &str) -> bool {
    token.to_lowercase().starts_with(&word.to_lowercase())
}
