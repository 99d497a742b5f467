//! Payload codec: one chat message per transport send, raw UTF-8, no framing or header.

/// Encode a chat message for the transport.
pub fn encode_text(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

/// Decode a received payload. Fails if the bytes are not valid UTF-8.
pub fn decode_text(bytes: &[u8]) -> Result<String, DecodeError> {
    let text = std::str::from_utf8(bytes)?;
    Ok(text.to_owned())
}

/// Received payload was not valid UTF-8.
#[derive(Debug, thiserror::Error)]
#[error("payload is not valid UTF-8: {0}")]
pub struct DecodeError(#[from] std::str::Utf8Error);
