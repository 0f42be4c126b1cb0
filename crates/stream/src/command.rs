//! Stream Command Parser
//!
//! Option strings such as `"BOTH APPEND NOBUFFER"` or `"= 5 LINE READ"` are
//! validated and decoded by a small table-driven engine:
//!
//! ```text
//!   input ──▶ TokenStream ──▶ lookup(rules) ──▶ actions[..] ──▶ context
//!                                  │
//!                                  └─ no match ──▶ unknown rule's handler
//! ```
//!
//! A token is either a run of non-blank, non-operator characters or a single
//! operator character. Tokens are `(start, len)` views into the input; nothing
//! is copied while scanning.
//!
//! A token selects the first rule whose keyword it is a case-insensitive
//! prefix of. If the token is shorter than that rule's minimum abbreviation
//! the whole string is rejected as ambiguous. Rules carry a list of
//! [`Action`]s that validate and update fields of a caller-supplied context;
//! the first failing action rejects the string. There is no rollback: a
//! rejected string leaves the context half-updated and callers discard it.
//!
//! Mutually exclusive options are written as separate rules that each guard
//! the same field with [`Action::ExclusiveInt`], so a conflict is detected
//! whichever option comes first.

use crate::error::ParseError;

/// Single-character operators that always form a token on their own
pub const OPERATORS: &[u8] = b"=<>+-~";

fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn is_operator(b: u8) -> bool {
    OPERATORS.contains(&b)
}

/// A token as an offset/length view into the parsed string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub start: usize,
    pub len: usize,
}

/// Left-to-right tokenizer with one token of pushback
#[derive(Debug)]
pub struct TokenStream<'a> {
    input: &'a str,
    pos: usize,
    pushed: Option<Token>,
}

impl<'a> TokenStream<'a> {
    pub fn new(input: &'a str) -> Self {
        TokenStream {
            input,
            pos: 0,
            pushed: None,
        }
    }

    /// Next token, or `None` once the input is exhausted
    pub fn next_token(&mut self) -> Option<Token> {
        if let Some(token) = self.pushed.take() {
            return Some(token);
        }

        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && is_blank(bytes[self.pos]) {
            self.pos += 1;
        }
        if self.pos >= bytes.len() {
            return None;
        }

        let start = self.pos;
        if is_operator(bytes[start]) {
            self.pos += 1;
        } else {
            while self.pos < bytes.len()
                && !is_blank(bytes[self.pos])
                && !is_operator(bytes[self.pos])
            {
                self.pos += 1;
            }
        }
        Some(Token {
            start,
            len: self.pos - start,
        })
    }

    /// Return a token so the next `next_token` yields it again
    pub fn push_back(&mut self, token: Token) {
        self.pushed = Some(token);
    }

    /// Text of a token produced by this stream
    pub fn text(&self, token: Token) -> &'a str {
        &self.input[token.start..token.start + token.len]
    }

    /// Everything not yet consumed, leading blanks removed
    pub fn remainder(&self) -> &'a str {
        let from = self.pushed.map(|t| t.start).unwrap_or(self.pos);
        self.input[from..].trim_start_matches([' ', '\t'])
    }

    fn pending(&self) -> Option<Token> {
        self.pushed
    }
}

/// Accessor for an integer (bit-set) field of the parse context
pub type IntField<C> = fn(&mut C) -> &mut u32;

/// Accessor for a boolean field of the parse context
pub type BoolField<C> = fn(&mut C) -> &mut bool;

/// Custom handler; may consume further tokens from the stream
pub type Handler<C> =
    fn(&KeywordRule<C>, &mut TokenStream<'_>, &mut C) -> Result<(), ParseError>;

/// One step executed when a keyword matches
pub enum Action<C: 'static> {
    /// OR bits into the field
    BitOr(IntField<C>, u32),
    /// AND the field with a mask
    BitAnd(IntField<C>, u32),
    /// Fail if the field is already nonzero
    ExclusiveInt(IntField<C>),
    /// Fail if the flag is already set
    ExclusiveBool(BoolField<C>),
    /// Fail unless all of these bits are already set
    RequireBits(IntField<C>, u32),
    /// Fail if any bit outside this mask is set
    OnlyBits(IntField<C>, u32),
    SetBool(BoolField<C>, bool),
    SetInt(IntField<C>, u32),
    Call(Handler<C>),
}

/// A keyword, its minimum abbreviation, and what it does
pub struct KeywordRule<C: 'static> {
    pub keyword: &'static str,
    pub min_len: usize,
    pub actions: &'static [Action<C>],
}

/// A rule table plus the rule used for tokens that match no keyword
pub struct CommandTable<C: 'static> {
    pub rules: &'static [KeywordRule<C>],
    pub unknown: Option<&'static KeywordRule<C>>,
}

/// True if `token` is a case-insensitive prefix of `keyword`
pub fn is_prefix_of(keyword: &str, token: &str) -> bool {
    !token.is_empty()
        && token.len() <= keyword.len()
        && keyword.as_bytes()[..token.len()].eq_ignore_ascii_case(token.as_bytes())
}

/// True if `token` names `keyword` with at least `min_len` characters
pub fn abbreviates(keyword: &str, min_len: usize, token: &str) -> bool {
    token.len() >= min_len && is_prefix_of(keyword, token)
}

impl<C: 'static> CommandTable<C> {
    fn lookup(&self, token: &str) -> Result<Option<&'static KeywordRule<C>>, ParseError> {
        for rule in self.rules {
            if is_prefix_of(rule.keyword, token) {
                if token.len() < rule.min_len {
                    return Err(ParseError::Ambiguous(token.to_string()));
                }
                return Ok(Some(rule));
            }
        }
        Ok(None)
    }
}

fn run_actions<C: 'static>(
    rule: &KeywordRule<C>,
    tokens: &mut TokenStream<'_>,
    ctx: &mut C,
    text: &str,
) -> Result<(), ParseError> {
    for action in rule.actions {
        let accepted = match action {
            Action::BitOr(field, bits) => {
                *field(ctx) |= *bits;
                true
            }
            Action::BitAnd(field, mask) => {
                *field(ctx) &= *mask;
                true
            }
            Action::ExclusiveInt(field) => *field(ctx) == 0,
            Action::ExclusiveBool(field) => !*field(ctx),
            Action::RequireBits(field, bits) => *field(ctx) & *bits == *bits,
            Action::OnlyBits(field, mask) => *field(ctx) & !*mask == 0,
            Action::SetBool(field, value) => {
                *field(ctx) = *value;
                true
            }
            Action::SetInt(field, value) => {
                *field(ctx) = *value;
                true
            }
            Action::Call(handler) => {
                handler(rule, tokens, ctx)?;
                true
            }
        };
        if !accepted {
            return Err(ParseError::Rejected(text.to_string()));
        }
    }
    Ok(())
}

/// Parse `input` against `table`, updating `ctx`
///
/// An empty (or all-blank) string is valid and leaves `ctx` untouched.
pub fn parse<C: 'static>(
    table: &CommandTable<C>,
    input: &str,
    ctx: &mut C,
) -> Result<(), ParseError> {
    let mut tokens = TokenStream::new(input);

    while let Some(token) = tokens.next_token() {
        let text = tokens.text(token);
        match table.lookup(text)? {
            Some(rule) => run_actions(rule, &mut tokens, ctx, text)?,
            None => {
                let Some(rule) = table.unknown else {
                    return Err(ParseError::Unrecognized(text.to_string()));
                };
                tokens.push_back(token);
                run_actions(rule, &mut tokens, ctx, text)?;
                // a handler that leaves the token in place did not accept it
                if tokens.pending() == Some(token) {
                    return Err(ParseError::Unrecognized(text.to_string()));
                }
            }
        }
    }
    Ok(())
}

/// Consume the next token as an unsigned decimal number
pub fn take_number(tokens: &mut TokenStream<'_>) -> Option<u64> {
    let token = tokens.next_token()?;
    let text = tokens.text(token);
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().ok()
    } else {
        tokens.push_back(token);
        None
    }
}
