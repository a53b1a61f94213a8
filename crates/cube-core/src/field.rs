//! Field types and the TLV body codec (spec §4.1, §6)
//!
//! Variable fields are framed with a 2-byte header: bits [15:10] carry the
//! 6-bit type code, bits [9:0] carry the value length (0..=1023). Field
//! type 0 (`CciEnd`) with length 0 terminates the body early.

use crate::error::FieldError;

/// The 6-bit field type code space (spec §6: "Variable field header (2 bytes)").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldType {
    /// Zero-length terminator for the TLV body.
    CciEnd = 0,
    /// Positional: version nibble | cube-type nibble, 1 byte.
    Type = 1,
    /// Positional: Ed25519 public key, 32 bytes (signed variants).
    PublicKey = 2,
    Payload = 3,
    Application = 4,
    Username = 5,
    MediaType = 6,
    /// Fixed 33 bytes: 1-byte relationship tag + 32-byte target key.
    RelatesTo = 7,
    /// Positional-near-front: 32-byte recipient key (NOTIFY variants).
    Notify = 8,
    Encrypted = 9,
    /// Fixed 32 bytes: sender's X25519 public key for Veritum sealing.
    CryptoPubkey = 10,
    /// Fixed 1 byte: subkey index used to derive an Identity extension key.
    SubkeySeed = 11,
    Description = 12,
    Contentname = 13,
    Padding = 14,
    Custom1 = 15,
    Custom2 = 16,
    Custom3 = 17,
    /// Fixed 7 bytes: 2-byte scheme + 5-byte seed.
    Avatar = 18,
    /// Positional trailer: 5-byte BE seconds-since-epoch.
    Date = 19,
    /// Positional trailer: 64-byte Ed25519 signature.
    Signature = 20,
    /// Positional trailer: 4-byte BE monotonic update count (PMUC only).
    PmucUpdateCount = 21,
    /// Positional trailer: 4-byte hashcash mining scratchpad.
    Nonce = 22,
}

impl FieldType {
    pub fn from_code(code: u8) -> std::result::Result<Self, FieldError> {
        use FieldType::*;
        Ok(match code {
            0 => CciEnd,
            1 => Type,
            2 => PublicKey,
            3 => Payload,
            4 => Application,
            5 => Username,
            6 => MediaType,
            7 => RelatesTo,
            8 => Notify,
            9 => Encrypted,
            10 => CryptoPubkey,
            11 => SubkeySeed,
            12 => Description,
            13 => Contentname,
            14 => Padding,
            15 => Custom1,
            16 => Custom2,
            17 => Custom3,
            18 => Avatar,
            19 => Date,
            20 => Signature,
            21 => PmucUpdateCount,
            22 => Nonce,
            other => return Err(FieldError::UnknownFieldType(other)),
        })
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Fixed byte length for positional/fixed-shape field types, if any.
    /// Variable fields (Payload, Application, ...) return `None`; `Padding`
    /// is variable too (minimum 2 bytes; length 1 is represented as CciEnd).
    pub fn fixed_length(self) -> Option<usize> {
        use FieldType::*;
        match self {
            Type => Some(1),
            PublicKey => Some(32),
            RelatesTo => Some(33),
            Notify => Some(32),
            CryptoPubkey => Some(32),
            SubkeySeed => Some(1),
            Avatar => Some(7),
            Date => Some(5),
            Signature => Some(64),
            PmucUpdateCount => Some(4),
            Nonce => Some(4),
            CciEnd => Some(0),
            _ => None,
        }
    }
}

/// A single decoded/constructed field (type + value bytes).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub field_type: FieldType,
    pub value: Vec<u8>,
}

impl Field {
    pub fn new(field_type: FieldType, value: impl Into<Vec<u8>>) -> std::result::Result<Self, FieldError> {
        let value = value.into();
        if let Some(expected) = field_type.fixed_length() {
            if value.len() != expected {
                return Err(FieldError::WrongLength {
                    field_type,
                    expected,
                    actual: value.len(),
                });
            }
        } else if value.len() > 1023 {
            return Err(FieldError::Oversized(value.len()));
        }
        Ok(Self { field_type, value })
    }

    pub fn payload(bytes: impl Into<Vec<u8>>) -> std::result::Result<Self, FieldError> {
        Self::new(FieldType::Payload, bytes)
    }

    pub fn relates_to(tag: u8, target: [u8; 32]) -> Self {
        let mut value = Vec::with_capacity(33);
        value.push(tag);
        value.extend_from_slice(&target);
        Field {
            field_type: FieldType::RelatesTo,
            value,
        }
    }

    pub fn as_relationship(&self) -> Option<(u8, [u8; 32])> {
        if self.field_type != FieldType::RelatesTo || self.value.len() != 33 {
            return None;
        }
        let tag = self.value[0];
        let mut target = [0u8; 32];
        target.copy_from_slice(&self.value[1..33]);
        Some((tag, target))
    }

    pub fn as_u32_be(&self) -> Option<u32> {
        if self.value.len() != 4 {
            return None;
        }
        Some(u32::from_be_bytes(self.value.clone().try_into().ok()?))
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }

    /// Encoded size of this field as it would appear in the TLV body
    /// (2-byte header + value), or 1 byte for `CciEnd`.
    pub fn encoded_len(&self) -> usize {
        if self.field_type == FieldType::CciEnd {
            1
        } else {
            2 + self.value.len()
        }
    }
}

/// Encode a single TLV field (2-byte header + value) into `out`.
/// `CciEnd` is encoded as the single zero byte that terminates the body.
pub fn encode_field(field: &Field, out: &mut Vec<u8>) -> std::result::Result<(), FieldError> {
    if field.field_type == FieldType::CciEnd {
        out.push(0);
        return Ok(());
    }
    if field.value.len() > 1023 {
        return Err(FieldError::Oversized(field.value.len()));
    }
    let header = ((field.field_type.code() as u16) << 10) | (field.value.len() as u16);
    out.extend_from_slice(&header.to_be_bytes());
    out.extend_from_slice(&field.value);
    Ok(())
}

/// Decode a TLV-framed body into an ordered list of fields, stopping at a
/// `CciEnd` marker or end-of-body. This is the "full" decode path; callers
/// on the hot admission path should prefer `crate::cube::parse_core`,
/// which never touches the body bytes as TLV.
pub fn decode_body(body: &[u8]) -> std::result::Result<Vec<Field>, FieldError> {
    let mut fields = Vec::new();
    let mut offset = 0usize;
    while offset < body.len() {
        if body[offset] == 0 {
            // CCI_END: either a lone zero byte (length-1 padding shorthand)
            // or the first byte of a zero-length type-0 header.
            break;
        }
        if offset + 2 > body.len() {
            return Err(FieldError::TruncatedHeader(offset));
        }
        let header = u16::from_be_bytes([body[offset], body[offset + 1]]);
        let type_code = (header >> 10) as u8;
        let len = (header & 0x3FF) as usize;
        let field_type = FieldType::from_code(type_code)?;
        offset += 2;
        if offset + len > body.len() {
            return Err(FieldError::TruncatedValue(offset, len));
        }
        let value = body[offset..offset + len].to_vec();
        offset += len;
        if field_type == FieldType::CciEnd {
            break;
        }
        fields.push(Field { field_type, value });
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_single_field() {
        let f = Field::payload(b"Cubus demonstrativus".to_vec()).unwrap();
        let mut buf = Vec::new();
        encode_field(&f, &mut buf).unwrap();
        let decoded = decode_body(&buf).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0], f);
    }

    #[test]
    fn round_trip_multiple_fields_with_terminator() {
        let fields = vec![
            Field::new(FieldType::Application, b"ID".to_vec()).unwrap(),
            Field::new(FieldType::Username, b"alice".to_vec()).unwrap(),
            Field {
                field_type: FieldType::CciEnd,
                value: vec![],
            },
        ];
        let mut buf = Vec::new();
        for f in &fields {
            encode_field(f, &mut buf).unwrap();
        }
        let decoded = decode_body(&buf).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].field_type, FieldType::Application);
        assert_eq!(decoded[1].field_type, FieldType::Username);
    }

    #[test]
    fn fixed_length_mismatch_is_rejected() {
        let err = Field::new(FieldType::Notify, vec![0u8; 10]).unwrap_err();
        assert!(matches!(err, FieldError::WrongLength { .. }));
    }

    #[test]
    fn oversized_variable_field_is_rejected() {
        let err = Field::new(FieldType::Payload, vec![0u8; 1024]).unwrap_err();
        assert!(matches!(err, FieldError::Oversized(1024)));
    }

    #[test]
    fn relationship_round_trip() {
        let target = [0x42u8; 32];
        let f = Field::relates_to(7, target);
        assert_eq!(f.as_relationship(), Some((7, target)));
    }
}
