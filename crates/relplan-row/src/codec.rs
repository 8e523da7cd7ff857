//! Wire encoding of single column values.
//!
//! Layout: one tag byte, then the value in little-endian form. Strings and
//! binaries carry a `u32` length prefix.

use relplan_core::types::Scalar;

use crate::error::{Result, RowError};
use crate::lazy::LazyDeserializer;

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_I32: u8 = 2;
const TAG_I64: u8 = 3;
const TAG_F32: u8 = 4;
const TAG_F64: u8 = 5;
const TAG_STR: u8 = 6;
const TAG_BIN: u8 = 7;

pub fn encode_scalar(value: &Scalar) -> Vec<u8> {
    let mut out = Vec::with_capacity(9);
    match value {
        Scalar::Null => out.push(TAG_NULL),
        Scalar::Bool(b) => {
            out.push(TAG_BOOL);
            out.push(u8::from(*b));
        }
        Scalar::I32(v) => {
            out.push(TAG_I32);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Scalar::I64(v) => {
            out.push(TAG_I64);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Scalar::F32(v) => {
            out.push(TAG_F32);
            out.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        Scalar::F64(v) => {
            out.push(TAG_F64);
            out.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        Scalar::Str(s) => {
            out.push(TAG_STR);
            out.extend_from_slice(&(s.len() as u32).to_le_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        Scalar::Bin(b) => {
            out.push(TAG_BIN);
            out.extend_from_slice(&(b.len() as u32).to_le_bytes());
            out.extend_from_slice(b);
        }
    }
    out
}

pub fn decode_scalar(bytes: &[u8]) -> Result<Scalar> {
    let (&tag, body) = bytes
        .split_first()
        .ok_or_else(|| RowError::Decode("empty payload".into()))?;
    let value = match tag {
        TAG_NULL => {
            expect_len(body, 0)?;
            Scalar::Null
        }
        TAG_BOOL => match body {
            [0] => Scalar::Bool(false),
            [1] => Scalar::Bool(true),
            _ => return Err(RowError::Decode("malformed BOOLEAN payload".into())),
        },
        TAG_I32 => Scalar::I32(i32::from_le_bytes(fixed(body)?)),
        TAG_I64 => Scalar::I64(i64::from_le_bytes(fixed(body)?)),
        TAG_F32 => Scalar::F32(f32::from_bits(u32::from_le_bytes(fixed(body)?))),
        TAG_F64 => Scalar::F64(f64::from_bits(u64::from_le_bytes(fixed(body)?))),
        TAG_STR => {
            let raw = length_prefixed(body)?;
            let s = std::str::from_utf8(raw)
                .map_err(|e| RowError::Decode(format!("invalid UTF-8: {e}")))?;
            Scalar::Str(s.to_string())
        }
        TAG_BIN => Scalar::Bin(length_prefixed(body)?.to_vec()),
        other => return Err(RowError::Decode(format!("unknown type tag {other}"))),
    };
    Ok(value)
}

fn expect_len(body: &[u8], n: usize) -> Result<()> {
    if body.len() != n {
        return Err(RowError::Decode(format!(
            "expected {n} payload bytes, got {}",
            body.len()
        )));
    }
    Ok(())
}

fn fixed<const N: usize>(body: &[u8]) -> Result<[u8; N]> {
    expect_len(body, N)?;
    let mut buf = [0u8; N];
    buf.copy_from_slice(body);
    Ok(buf)
}

fn length_prefixed(body: &[u8]) -> Result<&[u8]> {
    if body.len() < 4 {
        return Err(RowError::Decode("truncated length prefix".into()));
    }
    let (len, rest) = body.split_at(4);
    let len = u32::from_le_bytes(fixed(len)?) as usize;
    expect_len(rest, len)?;
    Ok(rest)
}

/// Decoder for payloads produced by `encode_scalar`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WireDeserializer;

impl LazyDeserializer for WireDeserializer {
    fn deserialize(&self, payload: &[u8]) -> Result<Scalar> {
        decode_scalar(payload)
    }
}
