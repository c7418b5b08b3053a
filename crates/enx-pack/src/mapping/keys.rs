//! Exposure key export encoding.
//!
//! An export file is the 16-byte header `"EK Export v1    "` followed by a
//! `TemporaryExposureKeyExport` message. Keys are sorted by key data so the
//! file does not leak submission order.

use enx_core::{DiagnosisKey, DAYS_SINCE_ONSET_UNKNOWN};
use prost::Message;

use super::proto::{SignatureInfo, TemporaryExposureKey, TemporaryExposureKeyExport};

/// Fixed header preceding every key export payload.
pub const EXPORT_HEADER: &[u8; 16] = b"EK Export v1    ";

/// Batch-level fields of one export file.
#[derive(Debug, Clone)]
pub struct KeyExportMetadata {
    pub region: String,
    /// First second covered by the batch (inclusive).
    pub start_timestamp: u64,
    /// End of the batch (exclusive).
    pub end_timestamp: u64,
    pub signature_info: SignatureInfo,
}

fn to_proto(key: &DiagnosisKey) -> TemporaryExposureKey {
    let dsos = key.days_since_onset_of_symptoms();
    TemporaryExposureKey {
        key_data: Some(key.key_data().as_bytes().to_vec()),
        transmission_risk_level: Some(key.transmission_risk_level()),
        rolling_start_interval_number: Some(key.rolling_start_interval_number()),
        rolling_period: Some(key.rolling_period()),
        report_type: Some(key.report_type().protocol_value()),
        days_since_onset_of_symptoms: (dsos != DAYS_SINCE_ONSET_UNKNOWN).then_some(dsos),
    }
}

/// Encode `keys` as one export file.
pub fn encode_key_export(keys: &[DiagnosisKey], metadata: &KeyExportMetadata) -> Vec<u8> {
    let mut sorted: Vec<&DiagnosisKey> = keys.iter().collect();
    sorted.sort_by(|a, b| a.key_data().cmp(b.key_data()));

    let export = TemporaryExposureKeyExport {
        start_timestamp: Some(metadata.start_timestamp),
        end_timestamp: Some(metadata.end_timestamp),
        region: Some(metadata.region.clone()),
        batch_num: Some(1),
        batch_size: Some(1),
        signature_infos: vec![metadata.signature_info.clone()],
        keys: sorted.into_iter().map(to_proto).collect(),
    };

    let body = export.encode_to_vec();
    let mut out = Vec::with_capacity(EXPORT_HEADER.len() + body.len());
    out.extend_from_slice(EXPORT_HEADER);
    out.extend_from_slice(&body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use enx_core::KeyData;

    fn metadata() -> KeyExportMetadata {
        KeyExportMetadata {
            region: "DE".into(),
            start_timestamp: 1_700_000_000,
            end_timestamp: 1_700_003_600,
            signature_info: SignatureInfo {
                verification_key_version: Some("v1".into()),
                verification_key_id: Some("abc".into()),
                signature_algorithm: Some("1.3.101.112".into()),
            },
        }
    }

    fn key(tag: u8) -> DiagnosisKey {
        DiagnosisKey::builder(KeyData::new(vec![tag; 16]).unwrap(), 2_800_000).build()
    }

    fn decode(bytes: &[u8]) -> TemporaryExposureKeyExport {
        assert_eq!(&bytes[..16], EXPORT_HEADER);
        TemporaryExposureKeyExport::decode(&bytes[16..]).unwrap()
    }

    #[test]
    fn header_and_batch_fields() {
        let export = decode(&encode_key_export(&[key(1)], &metadata()));
        assert_eq!(export.region.as_deref(), Some("DE"));
        assert_eq!(export.start_timestamp, Some(1_700_000_000));
        assert_eq!(export.batch_num, Some(1));
        assert_eq!(export.signature_infos.len(), 1);
        assert_eq!(export.keys[0].rolling_period, Some(144));
        assert_eq!(export.keys[0].report_type, Some(1));
    }

    #[test]
    fn keys_are_sorted_by_key_data() {
        let export = decode(&encode_key_export(&[key(9), key(3), key(5)], &metadata()));
        let firsts: Vec<u8> = export
            .keys
            .iter()
            .map(|k| k.key_data.as_ref().unwrap()[0])
            .collect();
        assert_eq!(firsts, vec![3, 5, 9]);
    }

    #[test]
    fn input_order_does_not_change_bytes() {
        assert_eq!(
            encode_key_export(&[key(1), key(2)], &metadata()),
            encode_key_export(&[key(2), key(1)], &metadata())
        );
    }

    #[test]
    fn unknown_onset_is_omitted() {
        let mut k = key(1);
        k.set_days_since_onset_of_symptoms(DAYS_SINCE_ONSET_UNKNOWN);
        let export = decode(&encode_key_export(&[k], &metadata()));
        assert_eq!(export.keys[0].days_since_onset_of_symptoms, None);
    }
}
