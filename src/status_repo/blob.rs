// Status BLOB layout: [version: u8][wincode ServerStatus].

use crate::error::{StoreError, StoreResult};
use crate::models::ServerStatus;

pub(super) const STATUS_BLOB_VERSION: u8 = 1;

pub(super) fn encode(status: &ServerStatus) -> StoreResult<Vec<u8>> {
    let payload = wincode::serialize(status)
        .map_err(|e| StoreError::Encoding(format!("wincode server_status: {}", e)))?;
    let mut out = Vec::with_capacity(1 + payload.len());
    out.push(STATUS_BLOB_VERSION);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// None for an empty blob or one written with another layout version.
pub(super) fn decode(bytes: &[u8]) -> StoreResult<Option<ServerStatus>> {
    match bytes.split_first() {
        Some((&STATUS_BLOB_VERSION, payload)) => wincode::deserialize::<ServerStatus>(payload)
            .map(Some)
            .map_err(|e| StoreError::Encoding(format!("wincode server_status: {}", e))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_prefixes_version_and_decodes_back() {
        let status = ServerStatus::observed("s1", true, 10.0, 20.0, 30.0, "2024-05-01T00:00:00Z");
        let bytes = encode(&status).unwrap();
        assert_eq!(bytes[0], STATUS_BLOB_VERSION);
        assert_eq!(decode(&bytes).unwrap(), Some(status));
    }

    #[test]
    fn decode_skips_unknown_version_and_empty() {
        assert_eq!(decode(&[]).unwrap(), None);
        assert_eq!(decode(&[99, 1, 2, 3]).unwrap(), None);
    }

    #[test]
    fn decode_reports_corrupt_payload() {
        assert!(decode(&[STATUS_BLOB_VERSION, 0xff]).is_err());
    }
}
