use serde::{Deserialize, Serialize};

/// Token ID as produced by the module's vocabulary.
pub type TokenId = u32;

/// Payload of the `tokenize` entry point. Response: MessagePack array of [`TokenId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizeRequest {
    pub text: String,
    pub include_special_tokens: bool,
}

impl TokenizeRequest {
    #[inline]
    pub fn new<S: Into<String>>(text: S, include_special_tokens: bool) -> Self {
        Self {
            text: text.into(),
            include_special_tokens,
        }
    }
}

/// Payload of the `detokenize` entry point. Response: raw UTF-8 text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetokenizeRequest {
    pub tokens: Vec<TokenId>,
    pub include_special_tokens: bool,
}

impl DetokenizeRequest {
    #[inline]
    pub fn new(tokens: &[TokenId], include_special_tokens: bool) -> Self {
        Self {
            tokens: tokens.to_vec(),
            include_special_tokens,
        }
    }
}
