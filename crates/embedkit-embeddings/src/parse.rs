//! Response-shape helpers shared by the HTTP adapters.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use embedkit_core::EmbedError;
use serde_json::Value;

/// A JSON array of numbers as an `f32` vector.
pub fn parse_vector(value: &Value, what: &str) -> Result<Vec<f32>, EmbedError> {
    let items = value
        .as_array()
        .ok_or_else(|| EmbedError::MalformedResponse(format!("{what} is not an array")))?;
    items
        .iter()
        .map(|v| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| {
                EmbedError::MalformedResponse(format!("{what} contains a non-numeric value: {v}"))
            })
        })
        .collect()
}

/// A JSON array of number arrays.
pub fn parse_vectors(value: &Value, what: &str) -> Result<Vec<Vec<f32>>, EmbedError> {
    value
        .as_array()
        .ok_or_else(|| EmbedError::MalformedResponse(format!("{what} is not an array")))?
        .iter()
        .map(|v| parse_vector(v, what))
        .collect()
}

/// OpenAI-style `{"data": [{"embedding": [...], "index": n}, ...]}`.
///
/// Items are returned in `index` order when the provider reports indices,
/// otherwise in response order.
pub fn parse_indexed_data(body: &Value) -> Result<Vec<Vec<f32>>, EmbedError> {
    let data = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| EmbedError::MalformedResponse("missing 'data' field in response".into()))?;

    let mut items = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(Value::as_u64)
            .map(|i| i as usize)
            .unwrap_or(position);
        let embedding = item
            .get("embedding")
            .ok_or_else(|| EmbedError::MalformedResponse("missing 'embedding' field".into()))?;
        items.push((index, embedding));
    }
    items.sort_by_key(|(index, _)| *index);

    items
        .into_iter()
        .map(|(_, embedding)| match embedding {
            Value::String(encoded) => decode_base64_f32(encoded),
            other => parse_vector(other, "embedding"),
        })
        .collect()
}

/// Base64 of packed little-endian `f32`s.
pub fn decode_base64_f32(encoded: &str) -> Result<Vec<f32>, EmbedError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| EmbedError::MalformedResponse(format!("invalid base64 embedding: {e}")))?;
    if bytes.len() % 4 != 0 {
        return Err(EmbedError::MalformedResponse(format!(
            "base64 embedding is {} bytes, not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn data_is_sorted_by_index() {
        let body = json!({"data": [
            {"embedding": [0.3, 0.4], "index": 1},
            {"embedding": [0.1, 0.2], "index": 0}
        ]});
        let vectors = parse_indexed_data(&body).unwrap();
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[test]
    fn non_numeric_values_are_malformed() {
        let err = parse_vector(&json!([0.1, "x"]), "embedding").unwrap_err();
        assert!(matches!(err, EmbedError::MalformedResponse(_)));
        let err = parse_indexed_data(&json!({"object": "list"})).unwrap_err();
        assert!(err.to_string().contains("data"));
    }

    #[test]
    fn decodes_little_endian_floats() {
        let bytes: Vec<u8> = [1.0f32, -0.5]
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .collect();
        let encoded = STANDARD.encode(bytes);
        assert_eq!(decode_base64_f32(&encoded).unwrap(), vec![1.0, -0.5]);
        assert!(decode_base64_f32("AAA=").is_err());
    }
}
