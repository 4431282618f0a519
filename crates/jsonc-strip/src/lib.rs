//! JSONC support for grammar, configuration, and diagnostic table files.
//!
//! [`strip_jsonc`] blanks out `//` line comments, `/* ... */` block comments
//! and trailing commas before `}` or `]`. Every removed byte is replaced by a
//! space (newlines are kept), so byte offsets and line/column positions
//! reported by `serde_json` still point into the original text.

/// Strip comments and trailing commas from JSONC input, preserving offsets.
///
/// String literals (including escaped quotes and comment-like sequences
/// inside them) are left untouched.
#[must_use]
pub fn strip_jsonc(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = bytes.to_vec();
    let mut i = 0usize;
    let mut in_str = false;
    // Position of a comma that may turn out to be trailing.
    let mut pending_comma: Option<usize> = None;

    while i < bytes.len() {
        let b = bytes[i];

        if in_str {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == b'"' {
                in_str = false;
            }
            i += 1;
            continue;
        }

        match b {
            b'"' => {
                in_str = true;
                pending_comma = None;
                i += 1;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    out[i] = b' ';
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let start = i;
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                let end = (i + 2).min(bytes.len());
                blank(&mut out[start..end]);
                i = end;
            }
            b',' => {
                pending_comma = Some(i);
                i += 1;
            }
            b'}' | b']' => {
                if let Some(pos) = pending_comma.take() {
                    out[pos] = b' ';
                }
                i += 1;
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                pending_comma = None;
                i += 1;
            }
        }
    }

    // Only ASCII bytes outside string literals were replaced, so the
    // buffer is still valid UTF-8.
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn blank(region: &mut [u8]) {
    for b in region {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}

#[cfg(test)]
mod tests {
    use super::strip_jsonc;

    #[test]
    fn strips_line_and_block_comments() {
        let input = r#"
{
  // comment
  "a": 1, /* inline */ "b": 2
}
"#;
        let stripped = strip_jsonc(input);
        assert!(!stripped.contains("comment"));
        assert!(!stripped.contains("inline"));
        assert!(stripped.contains("\"a\": 1,"));
        assert!(stripped.contains("\"b\": 2"));
    }

    #[test]
    fn preserves_offsets_and_newlines() {
        let input = "{ /* x\ny */ \"a\": 1 }";
        let stripped = strip_jsonc(input);
        assert_eq!(stripped.len(), input.len());
        assert_eq!(stripped.find('\n'), input.find('\n'));
        assert_eq!(stripped.find("\"a\""), input.find("\"a\""));
    }

    #[test]
    fn removes_trailing_commas() {
        let stripped = strip_jsonc("{\"modes\": [\"login\", \"enable\",\n], }");
        assert_eq!(stripped, "{\"modes\": [\"login\", \"enable\" \n]  }");
    }

    #[test]
    fn trailing_comma_before_comment_is_removed() {
        let stripped = strip_jsonc("[1, // last\n]");
        assert!(!stripped.contains(','));
    }

    #[test]
    fn keeps_comment_markers_inside_strings() {
        let input = r#"{"pattern": "^[a-z]+//x", "help": "a, ] b /* c */"}"#;
        assert_eq!(strip_jsonc(input), input);
    }

    #[test]
    fn handles_escaped_quotes() {
        let input = r#"{"a": "say \"hi\" // not a comment"}"#;
        assert_eq!(strip_jsonc(input), input);
    }

    #[test]
    fn unterminated_block_comment_blanks_to_end() {
        let stripped = strip_jsonc("{} /* open");
        assert_eq!(stripped.trim_end(), "{}");
    }

    #[test]
    fn multibyte_text_survives() {
        let input = "{\"help\": \"€ sign\", // €\n}";
        let stripped = strip_jsonc(input);
        assert!(stripped.contains("€ sign"));
        assert_eq!(stripped.len(), input.len());
    }
}
