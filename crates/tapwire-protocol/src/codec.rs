//! Value codec: bincode v2 structure bytes, base64-armored for the
//! line-delimited transport.
//!
//! The armor keeps payloads free of newline bytes, so a whole structured
//! value always fits on one response line.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tapwire_types::Value;

use crate::error::ProtocolError;

/// Encode a value as an ASCII-safe blob.
pub fn encode_value(value: &Value) -> Result<String, ProtocolError> {
    let config = bincode::config::standard();
    let bytes = bincode::encode_to_vec(value, config)
        .map_err(|e| ProtocolError::Encode(e.to_string()))?;
    Ok(STANDARD.encode(bytes))
}

/// Decode a blob produced by [`encode_value`].
pub fn decode_value(blob: &str) -> Result<Value, ProtocolError> {
    let bytes = STANDARD
        .decode(blob.trim())
        .map_err(|e| ProtocolError::Decode(e.to_string()))?;
    let config = bincode::config::standard();
    let (value, consumed): (Value, usize) = bincode::decode_from_slice(&bytes, config)
        .map_err(|e| ProtocolError::Decode(e.to_string()))?;
    if consumed != bytes.len() {
        return Err(ProtocolError::Decode(format!(
            "{} trailing bytes after value",
            bytes.len() - consumed
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: Value) {
        let blob = encode_value(&value).unwrap();
        assert!(!blob.contains('\n'), "armor must be newline-free");
        assert_eq!(decode_value(&blob).unwrap(), value);
    }

    #[test]
    fn scalar_roundtrips() {
        roundtrip(Value::None);
        roundtrip(Value::Bool(false));
        roundtrip(Value::Int(i64::MIN));
        roundtrip(Value::Int(i64::MAX));
        roundtrip(Value::Str(String::new()));
        roundtrip(Value::Str("line one\nline two".to_string()));
    }

    #[test]
    fn nested_roundtrips() {
        roundtrip(Value::List(vec![
            Value::List(vec![Value::Int(1), Value::Int(2)]),
            Value::Map(vec![
                ("input devices".to_string(), Value::List(vec![])),
                ("depth".to_string(), Value::Int(3)),
            ]),
            Value::None,
        ]));
    }

    #[test]
    fn malformed_base64_is_decode_error() {
        assert!(matches!(
            decode_value("@@@not-base64@@@"),
            Err(ProtocolError::Decode(_))
        ));
    }

    #[test]
    fn truncated_payload_is_decode_error() {
        let blob = encode_value(&Value::Str("a longer string payload".to_string())).unwrap();
        let cut = &blob[..blob.len() / 2];
        assert!(matches!(decode_value(cut), Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn trailing_garbage_rejected() {
        let mut bytes =
            bincode::encode_to_vec(Value::Int(1), bincode::config::standard()).unwrap();
        bytes.extend_from_slice(&[0, 0, 0]);
        let blob = STANDARD.encode(bytes);
        assert!(matches!(decode_value(&blob), Err(ProtocolError::Decode(_))));
    }
}
