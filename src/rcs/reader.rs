// RCS file reader.
//
// Parses the subset of the format this crate writes (plus unknown
// newphrases, which are kept as header keywords or skipped) and
// reconstructs trunk revisions by walking `next` from the head and
// applying each reverse delta to the text of its successor.

use std::collections::{HashMap, HashSet};

use super::revision::{InvalidRevision, RevisionNumber};
use super::writer::RcsHeader;
use crate::delta::{ScriptError, apply};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("unexpected end of file, expected {expected}")]
    UnexpectedEof { expected: &'static str },
    #[error("offset {offset}: expected {expected}, found {found:?}")]
    Unexpected {
        offset: usize,
        expected: &'static str,
        found: String,
    },
    #[error("offset {offset}: unterminated string")]
    UnterminatedString { offset: usize },
    #[error(transparent)]
    InvalidRevision(#[from] InvalidRevision),
    #[error("revision {0} is referenced but not present")]
    MissingRevision(RevisionNumber),
    #[error("revision {0} is reached twice while walking the trunk")]
    Cycle(RevisionNumber),
    #[error("revision {number}: {source}")]
    Script {
        number: RevisionNumber,
        #[source]
        source: ScriptError,
    },
}

// ---------------------------------------------------------------------------
// Parsed file
// ---------------------------------------------------------------------------

/// Metadata block of one revision, as read back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaMeta {
    pub number: RevisionNumber,
    pub date: String,
    pub author: String,
    pub state: String,
    pub branches: Vec<RevisionNumber>,
    pub next: Option<RevisionNumber>,
}

/// Log and text of one revision, unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaText {
    pub number: RevisionNumber,
    pub log: Vec<u8>,
    pub text: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcsFile {
    pub header: RcsHeader,
    /// Metadata blocks in file order.
    pub deltas: Vec<DeltaMeta>,
    /// Text blocks in file order.
    pub texts: Vec<DeltaText>,
}

impl RcsFile {
    pub fn parse(data: &[u8]) -> Result<Self, ReadError> {
        Parser::new(data).file()
    }

    pub fn delta(&self, number: RevisionNumber) -> Option<&DeltaMeta> {
        self.deltas.iter().find(|d| d.number == number)
    }

    pub fn text(&self, number: RevisionNumber) -> Option<&DeltaText> {
        self.texts.iter().find(|t| t.number == number)
    }

    /// Rebuild the content of every trunk revision, newest first.
    pub fn reconstruct(&self) -> Result<Vec<(RevisionNumber, Vec<u8>)>, ReadError> {
        let metas: HashMap<_, _> = self.deltas.iter().map(|d| (d.number, d)).collect();
        let texts: HashMap<_, _> = self.texts.iter().map(|t| (t.number, t)).collect();
        let mut seen = HashSet::new();
        let mut out: Vec<(RevisionNumber, Vec<u8>)> = Vec::with_capacity(self.deltas.len());

        let mut current = Some(self.header.head);
        while let Some(number) = current {
            if !seen.insert(number) {
                return Err(ReadError::Cycle(number));
            }
            let meta = metas
                .get(&number)
                .ok_or(ReadError::MissingRevision(number))?;
            let text = texts
                .get(&number)
                .ok_or(ReadError::MissingRevision(number))?;

            let content = match out.last() {
                None => text.text.clone(),
                Some((_, newer)) => apply(newer, &text.text)
                    .map_err(|source| ReadError::Script { number, source })?,
            };
            out.push((number, content));
            current = meta.next;
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Str(Vec<u8>),
    Semi,
    Colon,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Word(w) => w.clone(),
            Self::Str(_) => "@string@".to_string(),
            Self::Semi => ";".to_string(),
            Self::Colon => ":".to_string(),
        }
    }
}

struct Parser<'a> {
    data: &'a [u8],
    pos: usize,
    peeked: Option<(usize, Token)>,
}

impl<'a> Parser<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            peeked: None,
        }
    }

    fn lex(&mut self) -> Result<Option<(usize, Token)>, ReadError> {
        while self.pos < self.data.len() && self.data[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        let start = self.pos;
        let Some(&b) = self.data.get(start) else {
            return Ok(None);
        };
        let token = match b {
            b';' => {
                self.pos += 1;
                Token::Semi
            }
            b':' => {
                self.pos += 1;
                Token::Colon
            }
            b'@' => Token::Str(self.lex_string(start)?),
            _ => {
                let len = self.data[start..]
                    .iter()
                    .position(|&c| c.is_ascii_whitespace() || matches!(c, b';' | b':' | b'@'))
                    .unwrap_or(self.data.len() - start);
                self.pos = start + len;
                Token::Word(String::from_utf8_lossy(&self.data[start..self.pos]).into_owned())
            }
        };
        Ok(Some((start, token)))
    }

    fn lex_string(&mut self, start: usize) -> Result<Vec<u8>, ReadError> {
        let mut out = Vec::new();
        let mut i = start + 1;
        loop {
            let rest = &self.data[i..];
            let Some(at) = rest.iter().position(|&c| c == b'@') else {
                return Err(ReadError::UnterminatedString { offset: start });
            };
            out.extend_from_slice(&rest[..at]);
            i += at + 1;
            if self.data.get(i) == Some(&b'@') {
                out.push(b'@');
                i += 1;
            } else {
                self.pos = i;
                return Ok(out);
            }
        }
    }

    fn peek(&mut self) -> Result<Option<&Token>, ReadError> {
        if self.peeked.is_none() {
            self.peeked = self.lex()?;
        }
        Ok(self.peeked.as_ref().map(|(_, t)| t))
    }

    fn next(&mut self, expected: &'static str) -> Result<(usize, Token), ReadError> {
        match self.peeked.take() {
            Some(t) => Ok(t),
            None => self.lex()?.ok_or(ReadError::UnexpectedEof { expected }),
        }
    }

    fn unexpected(offset: usize, expected: &'static str, token: &Token) -> ReadError {
        ReadError::Unexpected {
            offset,
            expected,
            found: token.describe(),
        }
    }

    fn word(&mut self, expected: &'static str) -> Result<String, ReadError> {
        match self.next(expected)? {
            (_, Token::Word(w)) => Ok(w),
            (offset, t) => Err(Self::unexpected(offset, expected, &t)),
        }
    }

    fn keyword(&mut self, keyword: &'static str) -> Result<(), ReadError> {
        match self.next(keyword)? {
            (_, Token::Word(w)) if w == keyword => Ok(()),
            (offset, t) => Err(Self::unexpected(offset, keyword, &t)),
        }
    }

    fn semi(&mut self) -> Result<(), ReadError> {
        match self.next(";")? {
            (_, Token::Semi) => Ok(()),
            (offset, t) => Err(Self::unexpected(offset, ";", &t)),
        }
    }

    fn string(&mut self, expected: &'static str) -> Result<Vec<u8>, ReadError> {
        match self.next(expected)? {
            (_, Token::Str(s)) => Ok(s),
            (offset, t) => Err(Self::unexpected(offset, expected, &t)),
        }
    }

    fn revision(&mut self) -> Result<RevisionNumber, ReadError> {
        Ok(self.word("revision number")?.parse()?)
    }

    /// `[<rev>] ;`
    fn optional_revision(&mut self) -> Result<Option<RevisionNumber>, ReadError> {
        if self.peek()? == Some(&Token::Semi) {
            self.semi()?;
            return Ok(None);
        }
        let rev = self.revision()?;
        self.semi()?;
        Ok(Some(rev))
    }

    /// `[@string@] ;`
    fn optional_string(&mut self) -> Result<Option<Vec<u8>>, ReadError> {
        let value = if matches!(self.peek()?, Some(Token::Str(_))) {
            Some(self.string("string")?)
        } else {
            None
        };
        self.semi()?;
        Ok(value)
    }

    /// `{ <word> }* ;`
    fn words(&mut self) -> Result<Vec<String>, ReadError> {
        let mut words = Vec::new();
        loop {
            match self.next("word or ;")? {
                (_, Token::Semi) => return Ok(words),
                (_, Token::Word(w)) => words.push(w),
                (offset, t) => return Err(Self::unexpected(offset, "word or ;", &t)),
            }
        }
    }

    /// `{ <id> : <rev> }* ;`
    fn pairs(&mut self) -> Result<Vec<(String, RevisionNumber)>, ReadError> {
        let mut pairs = Vec::new();
        loop {
            match self.next("id:rev or ;")? {
                (_, Token::Semi) => return Ok(pairs),
                (_, Token::Word(name)) => {
                    match self.next(":")? {
                        (_, Token::Colon) => {}
                        (offset, t) => return Err(Self::unexpected(offset, ":", &t)),
                    }
                    pairs.push((name, self.revision()?));
                }
                (offset, t) => return Err(Self::unexpected(offset, "id:rev or ;", &t)),
            }
        }
    }

    /// Remaining tokens of a newphrase, up to and including `;`.
    fn phrase_value(&mut self) -> Result<String, ReadError> {
        let mut parts = Vec::new();
        loop {
            match self.next("newphrase value or ;")? {
                (_, Token::Semi) => return Ok(parts.join(" ")),
                (_, Token::Str(s)) => parts.push(String::from_utf8_lossy(&s).into_owned()),
                (_, t) => parts.push(t.describe()),
            }
        }
    }

    fn peek_is_revision(&mut self) -> Result<bool, ReadError> {
        Ok(matches!(self.peek()?, Some(Token::Word(w)) if w.parse::<RevisionNumber>().is_ok()))
    }

    fn peek_is_word(&mut self, word: &str) -> Result<bool, ReadError> {
        Ok(matches!(self.peek()?, Some(Token::Word(w)) if w == word))
    }

    fn file(mut self) -> Result<RcsFile, ReadError> {
        let mut header = self.admin()?;

        let mut deltas = Vec::new();
        while self.peek_is_revision()? {
            deltas.push(self.delta_meta()?);
        }

        self.keyword("desc")?;
        header.description = String::from_utf8_lossy(&self.string("description")?).into_owned();

        let mut texts = Vec::new();
        while self.peek()?.is_some() {
            texts.push(self.delta_text()?);
        }

        Ok(RcsFile {
            header,
            deltas,
            texts,
        })
    }

    fn admin(&mut self) -> Result<RcsHeader, ReadError> {
        self.keyword("head")?;
        let head = self
            .optional_revision()?
            .ok_or(ReadError::UnexpectedEof { expected: "head revision" })?;
        let mut header = RcsHeader::for_head(head);
        header.comment.clear();

        loop {
            if self.peek_is_revision()? || self.peek_is_word("desc")? {
                return Ok(header);
            }
            let field = match self.next("admin field")? {
                (_, Token::Word(w)) => w,
                (offset, t) => return Err(Self::unexpected(offset, "admin field", &t)),
            };
            match field.as_str() {
                "branch" => header.branch = self.optional_revision()?,
                "access" => header.access = self.words()?,
                "symbols" => header.symbols = self.pairs()?,
                "locks" => {
                    header.locks = self.pairs()?;
                    if self.peek_is_word("strict")? {
                        self.keyword("strict")?;
                        self.semi()?;
                        header.strict = true;
                    }
                }
                "comment" => {
                    header.comment = self
                        .optional_string()?
                        .map(|s| String::from_utf8_lossy(&s).into_owned())
                        .unwrap_or_default();
                }
                "expand" => {
                    header.expand = self
                        .optional_string()?
                        .map(|s| String::from_utf8_lossy(&s).into_owned());
                }
                _ => {
                    let value = self.phrase_value()?;
                    header.keywords.push((field, value));
                }
            }
        }
    }

    fn delta_meta(&mut self) -> Result<DeltaMeta, ReadError> {
        let number = self.revision()?;
        self.keyword("date")?;
        let date = self.word("date")?;
        self.semi()?;
        self.keyword("author")?;
        let author = self.words()?.join(" ");
        self.keyword("state")?;
        let state = self.words()?.join(" ");
        self.keyword("branches")?;
        let branches = self
            .words()?
            .iter()
            .map(|w| w.parse())
            .collect::<Result<Vec<RevisionNumber>, _>>()?;
        self.keyword("next")?;
        let next = self.optional_revision()?;

        // Skip newphrases attached to this revision.
        while !self.peek_is_revision()? && !self.peek_is_word("desc")? {
            self.word("newphrase")?;
            self.phrase_value()?;
        }

        Ok(DeltaMeta {
            number,
            date,
            author,
            state,
            branches,
            next,
        })
    }

    fn delta_text(&mut self) -> Result<DeltaText, ReadError> {
        let number = self.revision()?;
        self.keyword("log")?;
        let log = self.string("log")?;
        while !self.peek_is_word("text")? {
            self.word("newphrase")?;
            self.phrase_value()?;
        }
        self.keyword("text")?;
        let text = self.string("text")?;
        Ok(DeltaText { number, log, text })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
