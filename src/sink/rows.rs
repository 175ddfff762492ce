use serde::Serialize;

/// Serializes each row as one compact JSON object and joins them with single
/// spaces, the layout `FORMAT JSONEachRow` accepts after the statement.
pub fn encode_rows<T: Serialize>(rows: &[T]) -> Result<String, serde_json::Error> {
    let encoded = rows
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(encoded.join(" "))
}
