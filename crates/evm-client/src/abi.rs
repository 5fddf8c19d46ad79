//! Static ABI encoding.
//!
//! Every supported token is a single 32-byte head word, so a call payload is
//! just `selector ++ words` and constructor data is `bytecode ++ words`.

use alloy_primitives::keccak256;
use chainplan_core::{MethodSig, Token};

use crate::{EvmError, Result};

// ─── Encoding ─────────────────────────────────────────────────────────────

/// Encode one token as a left-padded 32-byte word.
pub fn encode_word(token: &Token) -> [u8; 32] {
    let mut word = [0u8; 32];
    match token {
        Token::Address(a) => word[12..].copy_from_slice(a.as_slice()),
        Token::Uint(v) => word = v.to_be_bytes::<32>(),
        Token::Bool(b) => word[31] = u8::from(*b),
        Token::Bytes32(b) => word.copy_from_slice(b.as_slice()),
    }
    word
}

pub fn encode_tokens(tokens: &[Token]) -> Vec<u8> {
    tokens.iter().flat_map(encode_word).collect()
}

/// First four bytes of keccak256 over the canonical signature.
pub fn selector(method: &MethodSig) -> [u8; 4] {
    let hash = keccak256(method.canonical().as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Calldata for `method(args)`. Arguments must already match the
/// signature; a mismatch here means the plan skipped validation.
pub fn encode_call(method: &MethodSig, args: &[Token]) -> Result<Vec<u8>> {
    if method.params.len() != args.len() {
        return Err(EvmError::Encoding(format!(
            "{method} takes {} argument(s), got {}",
            method.params.len(),
            args.len()
        )));
    }
    for (i, (param, arg)) in method.params.iter().zip(args).enumerate() {
        if !param.accepts(arg) {
            return Err(EvmError::Encoding(format!(
                "{method}: argument {i} ({arg}) is not a valid {param}"
            )));
        }
    }
    let mut data = selector(method).to_vec();
    data.extend(encode_tokens(args));
    Ok(data)
}

pub fn encode_constructor(bytecode: &[u8], args: &[Token]) -> Vec<u8> {
    let mut data = bytecode.to_vec();
    data.extend(encode_tokens(args));
    data
}

// ─── Tests ────────────────────────────────────────────────────────────────
