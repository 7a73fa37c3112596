use serde::{Deserialize, Serialize};

/// One analyzed token of a field: term text, its position and an optional payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub position: u32,
    pub payload: Option<Vec<u8>>,
}

impl Token {
    pub fn new(text: &str, position: u32) -> Self {
        Token { text: text.to_string(), position, payload: None }
    }

    pub fn with_payload(text: &str, position: u32, payload: &[u8]) -> Self {
        Token { text: text.to_string(), position, payload: Some(payload.to_vec()) }
    }
}

/// Indexing options of a field. All docs of a segment must agree on them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOptions {
    /// Only index which docs contain a term, drop freqs, positions and payloads.
    pub omit_term_freq_and_positions: bool,
}

impl FieldOptions {
    pub fn docs_only() -> Self {
        FieldOptions { omit_term_freq_and_positions: true }
    }
}

/// A field of a document and its token stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocField {
    pub name: String,
    pub options: FieldOptions,
    pub tokens: Vec<Token>,
}

impl DocField {
    pub fn new(name: &str, options: FieldOptions, tokens: Vec<Token>) -> Self {
        DocField { name: name.to_string(), options, tokens }
    }

    /// Tokens at increasing positions 0, 1, 2... one per whitespace separated word.
    pub fn from_text(name: &str, text: &str) -> Self {
        let tokens = text
            .split_whitespace()
            .enumerate()
            .map(|(position, word)| Token::new(word, position as u32))
            .collect();
        DocField::new(name, FieldOptions::default(), tokens)
    }
}

/// 一个待索引的文档，由若干 field 组成，token 已经由调用方分好词
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub fields: Vec<DocField>,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    pub fn add_field(&mut self, field: DocField) {
        self.fields.push(field);
    }

    pub fn add_text(&mut self, name: &str, text: &str) {
        self.fields.push(DocField::from_text(name, text));
    }

    pub fn num_tokens(&self) -> usize {
        self.fields.iter().map(|field| field.tokens.len()).sum()
    }
}
