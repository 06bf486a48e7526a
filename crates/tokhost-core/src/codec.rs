//! MessagePack exchange at the sandbox boundary.
//!
//! Requests are encoded as maps with snake_case field names. `tokenize`
//! answers with a MessagePack array of u32; `detokenize` and `chat_template`
//! answer with raw UTF-8 bytes.

use serde::Serialize;
use tokhost_abi::{ChatTemplateRequest, DetokenizeRequest, EntryPoint, TokenId, TokenizeRequest};

use crate::errors::{Result, TokenizerError};
use crate::sandbox::ModuleInstance;

/// A request type bound to the entry point that serves it.
pub trait Exchange: Serialize {
    const ENTRY: EntryPoint;
    type Response;

    fn decode_response(payload: Vec<u8>) -> Result<Self::Response>;
}

impl Exchange for TokenizeRequest {
    const ENTRY: EntryPoint = EntryPoint::Tokenize;
    type Response = Vec<TokenId>;

    fn decode_response(payload: Vec<u8>) -> Result<Vec<TokenId>> {
        decode_tokens(payload)
    }
}

impl Exchange for DetokenizeRequest {
    const ENTRY: EntryPoint = EntryPoint::Detokenize;
    type Response = String;

    fn decode_response(payload: Vec<u8>) -> Result<String> {
        decode_text(Self::ENTRY, payload)
    }
}

impl Exchange for ChatTemplateRequest {
    const ENTRY: EntryPoint = EntryPoint::ChatTemplate;
    type Response = String;

    fn decode_response(payload: Vec<u8>) -> Result<String> {
        decode_text(Self::ENTRY, payload)
    }
}

pub fn encode<R: Exchange>(request: &R) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(request).map_err(|source| TokenizerError::Encode {
        entry: R::ENTRY,
        source,
    })
}

/// Invoke the request's entry point with an already-encoded payload and decode the answer.
/// Nothing is decoded if the module reports failure.
pub fn call<R, I>(instance: &mut I, payload: &[u8]) -> Result<R::Response>
where
    R: Exchange,
    I: ModuleInstance + ?Sized,
{
    let out = instance
        .call(R::ENTRY, payload)
        .map_err(|source| match R::ENTRY {
            EntryPoint::ChatTemplate => TokenizerError::Template(source),
            entry => TokenizerError::Call { entry, source },
        })?;
    R::decode_response(out)
}

pub fn decode_tokens(payload: Vec<u8>) -> Result<Vec<TokenId>> {
    match rmp_serde::from_slice::<Vec<TokenId>>(&payload) {
        Ok(tokens) => Ok(tokens),
        Err(e) => Err(TokenizerError::Decode {
            entry: EntryPoint::Tokenize,
            reason: e.to_string(),
            payload,
        }),
    }
}

pub fn decode_text(entry: EntryPoint, payload: Vec<u8>) -> Result<String> {
    String::from_utf8(payload).map_err(|e| TokenizerError::Decode {
        entry,
        reason: e.utf8_error().to_string(),
        payload: e.into_bytes(),
    })
}
