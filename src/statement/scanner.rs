#[derive(Clone, Copy)]
enum Lex {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Backticked,
    Bracketed,
    LineComment,
    BlockComment,
}

/// Token classes that matter for deciding where a statement ends.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Token {
    Semi,
    Space,
    Other,
    Explain,
    Create,
    Temp,
    Trigger,
    End,
}

impl Token {
    fn classify(word: &[u8]) -> Self {
        const KEYWORDS: [(&[u8], Token); 6] = [
            (b"CREATE", Token::Create),
            (b"TEMP", Token::Temp),
            (b"TEMPORARY", Token::Temp),
            (b"TRIGGER", Token::Trigger),
            (b"EXPLAIN", Token::Explain),
            (b"END", Token::End),
        ];
        KEYWORDS
            .iter()
            .find(|(kw, _)| word.eq_ignore_ascii_case(kw))
            .map_or(Token::Other, |&(_, token)| token)
    }
}

/// Position within a statement, following the engine's own completeness rules.
///
/// Only `CREATE [TEMP] TRIGGER` at the head of a statement opens a trigger
/// body, and only `; END ;` inside that body closes it, so keywords used as
/// identifiers elsewhere never move the boundary.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Completion {
    Start,
    Normal,
    Explain,
    Create,
    Trigger,
    TriggerSemi,
    TriggerEnd,
}

impl Completion {
    fn advance(self, token: Token) -> Self {
        use Completion as C;
        use Token as T;
        match (self, token) {
            (C::Trigger | C::TriggerSemi, T::Semi) => C::TriggerSemi,
            (_, T::Semi) => C::Start,
            (state, T::Space) => state,
            (C::Start, T::Explain) | (C::Explain, T::Other) => C::Explain,
            (C::Start | C::Explain, T::Create) | (C::Create, T::Temp) => C::Create,
            (C::Create, T::Trigger) => C::Trigger,
            (C::TriggerSemi, T::End) => C::TriggerEnd,
            (C::Trigger | C::TriggerSemi | C::TriggerEnd, _) => C::Trigger,
            _ => C::Normal,
        }
    }
}

/// Identifier bytes: ASCII alphanumerics, `_`, `$`, and any non-ASCII byte.
fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Split off the first statement that contains anything besides whitespace and comments.
///
/// Returns the trimmed statement text (including its terminating `;`, if any)
/// and the unscanned remainder. Segments made only of whitespace, comments or
/// bare `;` are skipped.
pub(crate) fn split_first(sql: &str) -> Option<(&str, &str)> {
    let bytes = sql.as_bytes();
    let mut lex = Lex::Normal;
    let mut completion = Completion::Start;
    let mut seg_start = 0;
    let mut has_content = false;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        let rest = &bytes[idx..];
        let token = match lex {
            Lex::Normal => match b {
                b'\'' => {
                    lex = Lex::SingleQuoted;
                    Token::Other
                }
                b'"' => {
                    lex = Lex::DoubleQuoted;
                    Token::Other
                }
                b'`' => {
                    lex = Lex::Backticked;
                    Token::Other
                }
                b'[' => {
                    lex = Lex::Bracketed;
                    Token::Other
                }
                _ if rest.starts_with(b"--") => {
                    lex = Lex::LineComment;
                    idx += 1;
                    Token::Space
                }
                _ if rest.starts_with(b"/*") => {
                    lex = Lex::BlockComment;
                    idx += 1;
                    Token::Space
                }
                b';' => Token::Semi,
                _ if is_word_byte(b) => {
                    let len = rest.iter().take_while(|&&c| is_word_byte(c)).count();
                    idx += len - 1;
                    Token::classify(&rest[..len])
                }
                _ if b.is_ascii_whitespace() => Token::Space,
                _ => Token::Other,
            },
            Lex::SingleQuoted | Lex::DoubleQuoted | Lex::Backticked => {
                let quote = match lex {
                    Lex::SingleQuoted => b'\'',
                    Lex::DoubleQuoted => b'"',
                    _ => b'`',
                };
                if b == quote {
                    if rest.get(1) == Some(&quote) {
                        idx += 1; // doubled quote
                    } else {
                        lex = Lex::Normal;
                    }
                }
                Token::Space
            }
            Lex::Bracketed => {
                if b == b']' {
                    lex = Lex::Normal;
                }
                Token::Space
            }
            Lex::LineComment => {
                if b == b'\n' {
                    lex = Lex::Normal;
                }
                Token::Space
            }
            Lex::BlockComment => {
                if rest.starts_with(b"*/") {
                    lex = Lex::Normal;
                    idx += 1;
                }
                Token::Space
            }
        };

        completion = completion.advance(token);
        match token {
            Token::Semi if completion == Completion::Start => {
                if has_content {
                    return Some((sql[seg_start..=idx].trim(), &sql[idx + 1..]));
                }
                seg_start = idx + 1;
            }
            Token::Semi | Token::Space => {}
            _ => has_content = true,
        }
        idx += 1;
    }

    if has_content {
        Some((sql[seg_start..].trim(), ""))
    } else {
        None
    }
}
