//! # ABI Codec
//!
//! Ethereum contract ABI head/tail encoding for the parameter shapes the
//! diamond's facets accept and return.
//!
//! - Static values (`address`, `uintN`, `bool`, `bytesN`) occupy one 32-byte word.
//! - Dynamic values (`bytes`, `T[]`, tuples containing either) are referenced
//!   from the head by an offset relative to the start of the enclosing tuple.
//!
//! Decoding is schema-driven and bounds-checked: malformed input yields
//! [`AbiError`], never a panic.

use crate::domain::value_objects::{Address, Bytes, Hash, Selector, U256};
use crate::errors::AbiError;

const WORD: usize = 32;

// =============================================================================
// SCHEMA & TOKENS
// =============================================================================

/// Declared type of an ABI parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// `address`
    Address,
    /// `uintN`, with N in bits.
    Uint(u16),
    /// `bool`
    Bool,
    /// `bytesN`, with N in bytes (1..=32).
    FixedBytes(usize),
    /// `bytes`
    Bytes,
    /// `T[]`
    Array(Box<ParamType>),
    /// `(T1,T2,...)`
    Tuple(Vec<ParamType>),
}

impl ParamType {
    /// `bytes4[]`
    #[must_use]
    pub fn selector_array() -> Self {
        Self::Array(Box::new(Self::FixedBytes(4)))
    }

    /// Returns true if values of this type live in the tail.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::Bytes | Self::Array(_) => true,
            Self::Tuple(children) => children.iter().any(Self::is_dynamic),
            _ => false,
        }
    }

    fn head_size(&self) -> usize {
        match self {
            Self::Tuple(children) if !self.is_dynamic() => {
                children.iter().map(Self::head_size).sum()
            }
            _ => WORD,
        }
    }
}

/// A decoded (or to-be-encoded) ABI value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `address`
    Address(Address),
    /// Any unsigned integer width.
    Uint(U256),
    /// `bool`
    Bool(bool),
    /// `bytesN`
    FixedBytes(Vec<u8>),
    /// `bytes`
    Bytes(Vec<u8>),
    /// `T[]`
    Array(Vec<Token>),
    /// `(T1,T2,...)`
    Tuple(Vec<Token>),
}

impl Token {
    /// Wrap any integer that converts to U256.
    pub fn uint(value: impl Into<U256>) -> Self {
        Self::Uint(value.into())
    }

    /// Wrap a selector as `bytes4`.
    #[must_use]
    pub fn selector(selector: Selector) -> Self {
        Self::FixedBytes(selector.0.to_vec())
    }

    /// Wrap a hash as `bytes32`.
    #[must_use]
    pub fn hash(hash: Hash) -> Self {
        Self::FixedBytes(hash.0.to_vec())
    }

    fn is_dynamic(&self) -> bool {
        match self {
            Self::Bytes(_) | Self::Array(_) => true,
            Self::Tuple(children) => children.iter().any(Self::is_dynamic),
            _ => false,
        }
    }

    fn head_len(&self) -> usize {
        match self {
            Self::Tuple(children) if !self.is_dynamic() => {
                children.iter().map(Self::head_len).sum()
            }
            _ => WORD,
        }
    }

    /// Unwrap an `address`.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError::UnexpectedToken`] for any other token.
    pub fn into_address(self) -> Result<Address, AbiError> {
        match self {
            Self::Address(address) => Ok(address),
            _ => Err(AbiError::UnexpectedToken("address")),
        }
    }

    /// Unwrap an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError::UnexpectedToken`] for any other token.
    pub fn into_uint(self) -> Result<U256, AbiError> {
        match self {
            Self::Uint(value) => Ok(value),
            _ => Err(AbiError::UnexpectedToken("uint")),
        }
    }

    /// Unwrap a `bool`.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError::UnexpectedToken`] for any other token.
    pub fn into_bool(self) -> Result<bool, AbiError> {
        match self {
            Self::Bool(value) => Ok(value),
            _ => Err(AbiError::UnexpectedToken("bool")),
        }
    }

    /// Unwrap `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError::UnexpectedToken`] for any other token.
    pub fn into_bytes(self) -> Result<Vec<u8>, AbiError> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            _ => Err(AbiError::UnexpectedToken("bytes")),
        }
    }

    /// Unwrap a `bytes4` as a selector.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError::UnexpectedToken`] for any other token.
    pub fn into_selector(self) -> Result<Selector, AbiError> {
        match self {
            Self::FixedBytes(bytes) if bytes.len() == 4 => {
                Ok(Selector::new([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            _ => Err(AbiError::UnexpectedToken("bytes4")),
        }
    }

    /// Unwrap a `bytes32` as a hash.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError::UnexpectedToken`] for any other token.
    pub fn into_hash(self) -> Result<Hash, AbiError> {
        match self {
            Self::FixedBytes(bytes) => {
                Hash::from_slice(&bytes).ok_or(AbiError::UnexpectedToken("bytes32"))
            }
            _ => Err(AbiError::UnexpectedToken("bytes32")),
        }
    }

    /// Unwrap an array.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError::UnexpectedToken`] for any other token.
    pub fn into_array(self) -> Result<Vec<Token>, AbiError> {
        match self {
            Self::Array(items) => Ok(items),
            _ => Err(AbiError::UnexpectedToken("array")),
        }
    }

    /// Unwrap a tuple.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError::UnexpectedToken`] for any other token.
    pub fn into_tuple(self) -> Result<Vec<Token>, AbiError> {
        match self {
            Self::Tuple(items) => Ok(items),
            _ => Err(AbiError::UnexpectedToken("tuple")),
        }
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encode a parameter list as one tuple.
#[must_use]
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    encode_tuple(tokens)
}

/// Encode `selector ++ encode(tokens)`.
#[must_use]
pub fn encode_call(selector: Selector, tokens: &[Token]) -> Bytes {
    let mut data = selector.0.to_vec();
    data.extend(encode_tuple(tokens));
    Bytes(data)
}

fn encode_tuple(tokens: &[Token]) -> Vec<u8> {
    let head_len: usize = tokens.iter().map(Token::head_len).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
            tail.extend(encode_token(token));
        } else {
            head.extend(encode_token(token));
        }
    }

    head.extend(tail);
    head
}

fn encode_token(token: &Token) -> Vec<u8> {
    match token {
        Token::Address(address) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(address.as_bytes());
            word.to_vec()
        }
        Token::Uint(value) => uint_word(*value).to_vec(),
        Token::Bool(value) => uint_word(U256::from(u8::from(*value))).to_vec(),
        Token::FixedBytes(bytes) => {
            let mut word = [0u8; WORD];
            let len = bytes.len().min(WORD);
            word[..len].copy_from_slice(&bytes[..len]);
            word.to_vec()
        }
        Token::Bytes(bytes) => {
            let mut out = uint_word(U256::from(bytes.len())).to_vec();
            out.extend_from_slice(bytes);
            out.resize(WORD + padded_len(bytes.len()), 0);
            out
        }
        Token::Array(items) => {
            let mut out = uint_word(U256::from(items.len())).to_vec();
            out.extend(encode_tuple(items));
            out
        }
        Token::Tuple(items) => encode_tuple(items),
    }
}

fn uint_word(value: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD) * WORD
}

// =============================================================================
// DECODING
// =============================================================================

/// Decode a parameter list encoded as one tuple.
///
/// # Errors
///
/// Returns [`AbiError`] on truncated or malformed input.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    Decoder::new(data).tuple(types, 0)
}

/// Decode the arguments that follow a 4-byte selector.
///
/// # Errors
///
/// Returns [`AbiError`] on truncated or malformed input.
pub fn decode_call_args(types: &[ParamType], calldata: &[u8]) -> Result<ArgReader, AbiError> {
    let args = calldata.get(4..).unwrap_or(&[]);
    Ok(ArgReader::new(decode(types, args)?))
}

/// Tokens decoded per payload word, plus a fixed allowance for nested
/// static tuples.
const TOKENS_PER_WORD: usize = 4;
const TOKEN_ALLOWANCE: usize = 16;

/// Walks one payload with a token budget. Offsets may point back into
/// regions already decoded, so without the budget a nested array payload
/// could expand quadratically.
struct Decoder<'a> {
    data: &'a [u8],
    limit: usize,
    decoded: usize,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        let limit = (data.len() / WORD)
            .saturating_mul(TOKENS_PER_WORD)
            .saturating_add(TOKEN_ALLOWANCE);
        Self {
            data,
            limit,
            decoded: 0,
        }
    }

    fn charge(&mut self, count: usize) -> Result<(), AbiError> {
        self.decoded = self.decoded.saturating_add(count);
        if self.decoded > self.limit {
            return Err(AbiError::TooManyTokens { limit: self.limit });
        }
        Ok(())
    }

    fn tuple(&mut self, types: &[ParamType], base: usize) -> Result<Vec<Token>, AbiError> {
        self.charge(types.len())?;
        let mut tokens = Vec::with_capacity(types.len());
        let mut cursor = base;

        for ty in types {
            if ty.is_dynamic() {
                let offset = read_usize(self.data, cursor)?;
                let at = base
                    .checked_add(offset)
                    .ok_or(AbiError::Overflow(U256::from(offset)))?;
                tokens.push(self.at(ty, at)?);
                cursor += WORD;
            } else {
                tokens.push(self.at(ty, cursor)?);
                cursor += ty.head_size();
            }
        }

        Ok(tokens)
    }

    fn at(&mut self, ty: &ParamType, at: usize) -> Result<Token, AbiError> {
        let data = self.data;
        match ty {
            ParamType::Address => {
                let word = read_word(data, at)?;
                if word[..12].iter().any(|b| *b != 0) {
                    return Err(AbiError::InvalidAddress);
                }
                let mut bytes = [0u8; 20];
                bytes.copy_from_slice(&word[12..]);
                Ok(Token::Address(Address::new(bytes)))
            }
            ParamType::Uint(bits) => {
                let value = U256::from_big_endian(&read_word(data, at)?);
                if *bits < 256 && (value >> usize::from(*bits)) != U256::zero() {
                    return Err(AbiError::IntegerTooLarge { value, bits: *bits });
                }
                Ok(Token::Uint(value))
            }
            ParamType::Bool => match U256::from_big_endian(&read_word(data, at)?) {
                v if v.is_zero() => Ok(Token::Bool(false)),
                v if v == U256::one() => Ok(Token::Bool(true)),
                _ => Err(AbiError::InvalidBool),
            },
            ParamType::FixedBytes(len) => {
                let word = read_word(data, at)?;
                Ok(Token::FixedBytes(word[..(*len).min(WORD)].to_vec()))
            }
            ParamType::Bytes => {
                let len = read_usize(data, at)?;
                let start = at + WORD;
                Ok(Token::Bytes(read_slice(data, start, len)?.to_vec()))
            }
            ParamType::Array(inner) => {
                let len = read_usize(data, at)?;
                // Every element needs at least one head word.
                let room = data.len().saturating_sub(at + WORD) / WORD;
                if len > room {
                    return Err(AbiError::OutOfBounds {
                        offset: at + WORD,
                        needed: len.saturating_mul(WORD),
                        len: data.len(),
                    });
                }
                let types = vec![inner.as_ref().clone(); len];
                Ok(Token::Array(self.tuple(&types, at + WORD)?))
            }
            ParamType::Tuple(children) => Ok(Token::Tuple(self.tuple(children, at)?)),
        }
    }
}

fn read_slice(data: &[u8], offset: usize, needed: usize) -> Result<&[u8], AbiError> {
    offset
        .checked_add(needed)
        .and_then(|end| data.get(offset..end))
        .ok_or(AbiError::OutOfBounds {
            offset,
            needed,
            len: data.len(),
        })
}

fn read_word(data: &[u8], offset: usize) -> Result<[u8; WORD], AbiError> {
    let mut word = [0u8; WORD];
    word.copy_from_slice(read_slice(data, offset, WORD)?);
    Ok(word)
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize, AbiError> {
    let value = U256::from_big_endian(&read_word(data, offset)?);
    if value > U256::from(data.len()) {
        return Err(AbiError::Overflow(value));
    }
    Ok(value.as_usize())
}

/// Narrow a U256 to u64.
///
/// # Errors
///
/// Returns [`AbiError::IntegerTooLarge`] if the value needs more than 64 bits.
pub fn to_u64(value: U256) -> Result<u64, AbiError> {
    if value > U256::from(u64::MAX) {
        return Err(AbiError::IntegerTooLarge { value, bits: 64 });
    }
    Ok(value.low_u64())
}

/// Narrow a U256 to u8.
///
/// # Errors
///
/// Returns [`AbiError::IntegerTooLarge`] if the value needs more than 8 bits.
pub fn to_u8(value: U256) -> Result<u8, AbiError> {
    if value > U256::from(u8::MAX) {
        return Err(AbiError::IntegerTooLarge { value, bits: 8 });
    }
    // Checked above.
    Ok(value.low_u32() as u8)
}

// =============================================================================
// ARGUMENT READER
// =============================================================================

/// Sequential typed access to decoded call arguments.
#[derive(Debug)]
pub struct ArgReader {
    tokens: std::vec::IntoIter<Token>,
}

impl ArgReader {
    /// Wrap decoded tokens.
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter(),
        }
    }

    /// Next raw token.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError::UnexpectedToken`] if the arguments ran out.
    pub fn token(&mut self) -> Result<Token, AbiError> {
        self.tokens
            .next()
            .ok_or(AbiError::UnexpectedToken("another argument"))
    }

    /// Next `address`.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError`] if missing or of another type.
    pub fn address(&mut self) -> Result<Address, AbiError> {
        self.token()?.into_address()
    }

    /// Next unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError`] if missing or of another type.
    pub fn uint(&mut self) -> Result<U256, AbiError> {
        self.token()?.into_uint()
    }

    /// Next unsigned integer narrowed to u8.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError`] if missing, of another type or too large.
    pub fn uint8(&mut self) -> Result<u8, AbiError> {
        to_u8(self.uint()?)
    }

    /// Next `bool`.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError`] if missing or of another type.
    pub fn boolean(&mut self) -> Result<bool, AbiError> {
        self.token()?.into_bool()
    }

    /// Next `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError`] if missing or of another type.
    pub fn bytes(&mut self) -> Result<Vec<u8>, AbiError> {
        self.token()?.into_bytes()
    }

    /// Next `bytes4`.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError`] if missing or of another type.
    pub fn selector(&mut self) -> Result<Selector, AbiError> {
        self.token()?.into_selector()
    }

    /// Next `bytes32`.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError`] if missing or of another type.
    pub fn hash(&mut self) -> Result<Hash, AbiError> {
        self.token()?.into_hash()
    }

    /// Next array.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError`] if missing or of another type.
    pub fn array(&mut self) -> Result<Vec<Token>, AbiError> {
        self.token()?.into_array()
    }
}

// =============================================================================
// TESTS
// =============================================================================
