use lazy_static::lazy_static;
use miette::Result;
use regex::Regex;

use crate::error;
use crate::lexer::cursor::Cursor;
use crate::span::{Span, SrcOffset};

mod cursor;

/// A single token of 8085 source.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LiteralKind {
    Hex,
    Dec,
    Bin,
    Oct,
    Char,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// `NAME:` at the start of a statement
    LabelDef,
    /// Mnemonic, directive, register or label reference
    Ident,
    Lit(LiteralKind),
    Comment,
    /// Statement terminator
    Newline,
    /// Commas and intra-line whitespace
    Junk,
    Unknown,
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TokenKind::LabelDef => "label definition",
            TokenKind::Ident => "identifier",
            TokenKind::Lit(LiteralKind::Hex) => "hex literal",
            TokenKind::Lit(LiteralKind::Dec) => "decimal literal",
            TokenKind::Lit(LiteralKind::Bin) => "binary literal",
            TokenKind::Lit(LiteralKind::Oct) => "octal literal",
            TokenKind::Lit(LiteralKind::Char) => "character literal",
            TokenKind::Comment => "comment",
            TokenKind::Newline => "end of line",
            TokenKind::Junk => "whitespace",
            TokenKind::Unknown => "unknown token",
            TokenKind::Eof => "end of file",
        };
        f.write_str(s)
    }
}

lazy_static! {
    // Order is important since some patterns are subpatterns of others.
    // Do NOT rearrange without a good hard think.
    static ref PATTERNS: Vec<(TokenKind, Regex)> = vec![
        (TokenKind::Newline, Regex::new(r"^\r?\n").unwrap()),
        (TokenKind::Junk, Regex::new(r"^[ \t,]+").unwrap()),
        (TokenKind::Comment, Regex::new(r"^;[^\n]*").unwrap()),
        // Intel convention: the suffixed forms must start with a decimal
        // digit, so 0BEEFh is a number and BEEFh is an identifier.
        (
            TokenKind::Lit(LiteralKind::Hex),
            Regex::new(r"^(0[xX][0-9a-fA-F]+|\$[0-9a-fA-F]+|[0-9][0-9a-fA-F]*[hH])\b").unwrap(),
        ),
        (
            TokenKind::Lit(LiteralKind::Bin),
            Regex::new(r"^[01]+[bB]\b").unwrap(),
        ),
        (
            TokenKind::Lit(LiteralKind::Oct),
            Regex::new(r"^[0-7]+[qQ]\b").unwrap(),
        ),
        (
            TokenKind::Lit(LiteralKind::Dec),
            Regex::new(r"^[0-9]+\b").unwrap(),
        ),
        (
            TokenKind::Lit(LiteralKind::Char),
            Regex::new(r"^'[^'\n]'").unwrap(),
        ),
        (TokenKind::LabelDef, Regex::new(r"^[a-zA-Z_]\w*:").unwrap()),
        // Includes mnemonics, directives, registers, and label references.
        (TokenKind::Ident, Regex::new(r"^[a-zA-Z_]\w*\b").unwrap()),
    ];
}

impl Cursor<'_> {
    pub fn advance_token(&mut self) -> Token {
        if self.is_eof() {
            return Token {
                kind: TokenKind::Eof,
                span: Span::new(SrcOffset(self.abs_pos()), 0),
            };
        }

        for (kind, re) in PATTERNS.iter() {
            if let Some(tok) = re.find(self.rest()) {
                let token = Token {
                    kind: *kind,
                    span: Span::new(SrcOffset(self.abs_pos()), tok.len()),
                };
                self.advance(tok.len());
                return token;
            }
        }

        self.bump();
        Token {
            kind: TokenKind::Unknown,
            span: Span::new(SrcOffset(self.abs_pos() - 1), 1),
        }
    }
}

/// Mostly used for debug purposes; assembly goes through [`SourceFile`].
pub fn tokenize(input: &str) -> impl Iterator<Item = Token> + '_ {
    let mut cursor = Cursor::new(input);
    std::iter::from_fn(move || {
        let token = cursor.advance_token();
        if token.kind != TokenKind::Eof {
            Some(token)
        } else {
            None
        }
    })
}

/// Tokenised source with a rewindable cursor over the significant tokens.
///
/// Comments and junk are stripped during tokenisation; newlines survive as
/// statement terminators. Token boundaries never cross a newline.
pub struct SourceFile {
    path: String,
    src: String,
    toks: Vec<Token>,
    pos: usize,
}

impl SourceFile {
    pub fn new(src: impl Into<String>, path: impl Into<String>) -> Result<Self> {
        let src = src.into();
        let path = path.into();
        let mut toks = Vec::new();
        let mut cursor = Cursor::new(&src);
        loop {
            let tok = cursor.advance_token();
            match tok.kind {
                TokenKind::Junk | TokenKind::Comment => continue,
                TokenKind::Unknown => {
                    return Err(error::lex_unknown(tok.span, &src, &path));
                }
                TokenKind::Eof => break,
                _ => toks.push(tok),
            }
        }
        Ok(SourceFile {
            path,
            src,
            toks,
            pos: 0,
        })
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Text underneath a token
    pub fn slice(&self, span: Span) -> &str {
        &self.src[span.as_range()]
    }

    /// Next significant token without consuming it
    pub fn peek(&self) -> Option<Token> {
        self.toks.get(self.pos).copied()
    }

    pub fn next_tok(&mut self) -> Option<Token> {
        let tok = self.toks.get(self.pos).copied();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Reset the cursor for another pass
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// `(line, col)` of a byte offset, both 1-based. Used for error output.
    pub fn location(&self, offs: usize) -> (usize, usize) {
        let offs = offs.min(self.src.len());
        let upto = &self.src[..offs];
        let line = upto.matches('\n').count() + 1;
        let col = offs - upto.rfind('\n').map(|p| p + 1).unwrap_or(0) + 1;
        (line, col)
    }

    /// End-of-source span for unexpected-EOF diagnostics
    pub fn eof_span(&self) -> Span {
        Span::new(SrcOffset(self.src.len().saturating_sub(1)), 1)
    }
}
