//! Minimal contract ABI encoding.
//!
//! Covers the value kinds the protocol constructors and wiring calls take:
//! `address`, `uint256`, `bool`, `bytes4`, `string` and tuples of those.

use serde::{Deserialize, Serialize};

use crate::identity::keccak256;
use crate::types::{Address, Selector};

const WORD: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    #[error("malformed method signature '{0}'")]
    MalformedSignature(String),
    #[error("return data too short: expected {expected} bytes, got {actual}")]
    ShortData { expected: usize, actual: usize },
    #[error("word is not a left-padded address")]
    NotAnAddress,
}

/// A fully resolved ABI value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Token {
    Address(Address),
    Uint(u128),
    Bool(bool),
    Bytes4(Selector),
    String(String),
    Tuple(Vec<Token>),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        match self {
            Token::String(_) => true,
            Token::Tuple(items) => items.iter().any(Token::is_dynamic),
            _ => false,
        }
    }

    /// Size of this token's slot in the head of its enclosing tuple.
    fn head_len(&self) -> usize {
        match self {
            Token::Tuple(items) if !self.is_dynamic() => {
                items.iter().map(Token::head_len).sum()
            }
            _ => WORD,
        }
    }
}

/// Encode a parameter list (the body of constructor or call data).
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_size: usize = tokens.iter().map(Token::head_len).sum();
    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend(uint_word((head_size + tail.len()) as u128));
            tail.extend(encode_single(token));
        } else {
            head.extend(encode_single(token));
        }
    }

    head.extend(tail);
    head
}

fn encode_single(token: &Token) -> Vec<u8> {
    match token {
        Token::Address(addr) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(addr.as_bytes());
            word.to_vec()
        }
        Token::Uint(value) => uint_word(*value).to_vec(),
        Token::Bool(flag) => uint_word(u128::from(*flag)).to_vec(),
        Token::Bytes4(selector) => {
            let mut word = [0u8; WORD];
            word[..4].copy_from_slice(&selector.0);
            word.to_vec()
        }
        Token::String(text) => {
            let bytes = text.as_bytes();
            let padded = bytes.len().div_ceil(WORD) * WORD;
            let mut out = Vec::with_capacity(WORD + padded);
            out.extend(uint_word(bytes.len() as u128));
            out.extend_from_slice(bytes);
            out.resize(WORD + padded, 0);
            out
        }
        Token::Tuple(items) => encode(items),
    }
}

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// First four bytes of the keccak hash of a canonical method signature.
pub fn selector(signature: &str) -> Selector {
    let hash = keccak256(signature.as_bytes());
    Selector([hash[0], hash[1], hash[2], hash[3]])
}

/// Selector followed by the encoded arguments.
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut out = selector(signature).0.to_vec();
    out.extend(encode(tokens));
    out
}

/// Number of top-level parameters declared by `name(type,...)`.
pub fn param_count(signature: &str) -> Result<usize, AbiError> {
    let malformed = || AbiError::MalformedSignature(signature.to_string());
    let open = signature.find('(').ok_or_else(malformed)?;
    if open == 0 || !signature.ends_with(')') {
        return Err(malformed());
    }
    let params = &signature[open + 1..signature.len() - 1];
    if params.is_empty() {
        return Ok(0);
    }

    let mut depth = 0i32;
    let mut count = 1;
    for ch in params.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => count += 1,
            _ => {}
        }
        if depth < 0 {
            return Err(malformed());
        }
    }
    if depth != 0 {
        return Err(malformed());
    }
    Ok(count)
}

/// The `index`-th 32-byte word of `data`.
pub fn word(data: &[u8], index: usize) -> Result<&[u8], AbiError> {
    let start = index * WORD;
    data.get(start..start + WORD).ok_or(AbiError::ShortData {
        expected: start + WORD,
        actual: data.len(),
    })
}

/// Decode an address returned as the first word of call output.
pub fn decode_address(data: &[u8]) -> Result<Address, AbiError> {
    let word = word(data, 0)?;
    if word[..12].iter().any(|b| *b != 0) {
        return Err(AbiError::NotAnAddress);
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(&word[12..]);
    Ok(Address(out))
}

/// Decode a uint that fits in 128 bits.
pub fn decode_uint(word: &[u8]) -> Option<u128> {
    if word.len() != WORD || word[..16].iter().any(|b| *b != 0) {
        return None;
    }
    let mut out = [0u8; 16];
    out.copy_from_slice(&word[16..]);
    Some(u128::from_be_bytes(out))
}
