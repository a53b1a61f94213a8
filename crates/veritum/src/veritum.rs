//! The Veritum: a logical record that may span multiple Cubes, linked by
//! `CONTINUED_IN` relationships (spec §3 "Veritum", §4.4).

use crate::crypto;
use crate::error::{Error, Result};
use cube_core::field::{decode_body, encode_field};
use cube_core::relationship::{Relationship, RelationshipType};
use cube_core::{CancelToken, Cube, CubeKey, CubeKeys, CubeType, Field, FieldType};
use ed25519_dalek::SigningKey;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret as X25519Secret};

/// A field that must not be split across chunks, injected by `compile`.
const CONTINUED_IN_LEN: usize = 35; // 2-byte header + 1-byte tag + 32-byte key

/// Options for [`compile`] (spec §4.4 `compile(opts)`).
pub struct CompileOptions {
    /// Lifecycle/notify variant of the root chunk. Continuation chunks are
    /// always FROZEN, sidestepping the acknowledged reference ambiguity
    /// around multi-chunk MUC/PMUC handling (spec §9 Open Questions).
    pub root_type: CubeType,
    pub keys: CubeKeys,
    pub required_difficulty: u32,
    /// Recipients to seal the payload for. Empty means no encryption.
    pub recipients: Vec<X25519Public>,
    /// Required when `recipients` is non-empty: the sender's signing key,
    /// from which the X25519 sealing keypair is derived.
    pub sender_signing_key: Option<SigningKey>,
    pub date: Option<u64>,
}

impl CompileOptions {
    pub fn plain(root_type: CubeType, keys: CubeKeys, required_difficulty: u32) -> Self {
        Self {
            root_type,
            keys,
            required_difficulty,
            recipients: Vec::new(),
            sender_signing_key: None,
            date: None,
        }
    }

    pub fn with_recipients(mut self, sender_signing_key: SigningKey, recipients: Vec<X25519Public>) -> Self {
        self.sender_signing_key = Some(sender_signing_key);
        self.recipients = recipients;
        self
    }
}

/// Options for [`from_chunks`].
#[derive(Default)]
pub struct DecodeOptions {
    pub recipient_private_key: Option<X25519Secret>,
}

/// A reassembled multi-Cube record (spec §3 "Veritum").
pub struct Veritum {
    pub chunks: Vec<Cube>,
    /// Logical fields: the concatenation of every chunk's payload fields,
    /// or (when encrypted and successfully opened) the decrypted fields.
    pub fields: Vec<Field>,
    pub encrypted: bool,
    pub decrypted: bool,
}

impl Veritum {
    pub fn key(&self) -> Result<CubeKey> {
        Ok(self.chunks.first().ok_or(Error::Empty)?.get_key()?)
    }

    pub fn first_of_type(&self, field_type: FieldType) -> Option<&Field> {
        self.fields.iter().find(|f| f.field_type == field_type)
    }

    pub fn payload(&self) -> Vec<u8> {
        self.fields
            .iter()
            .filter(|f| f.field_type == FieldType::Payload)
            .flat_map(|f| f.value.clone())
            .collect()
    }
}

fn capacity_for(cube_type: CubeType, reserve_continuation: bool) -> usize {
    let layout = cube_core::cube::Layout::for_type(cube_type);
    let cap = layout.body_end - layout.body_start;
    if reserve_continuation {
        cap.saturating_sub(CONTINUED_IN_LEN)
    } else {
        cap
    }
}

/// Greedily bin-pack `fields` into chunks, where chunk 0 uses `root_type`'s
/// capacity and every later chunk uses FROZEN's capacity (spec §4.4 step 2).
/// Every non-tail chunk reserves room for one `CONTINUED_IN` field.
fn bin_pack(fields: &[Field], root_type: CubeType) -> Result<Vec<Vec<Field>>> {
    if fields.is_empty() {
        return Ok(vec![Vec::new()]);
    }
    let mut chunks: Vec<Vec<Field>> = vec![Vec::new()];
    let mut chunk_type = root_type;
    let mut used = 0usize;
    // Conservatively always reserve CONTINUED_IN room; a final pass drops
    // the reservation from the tail chunk once the chain length is known.
    let mut capacity = capacity_for(chunk_type, true);

    for field in fields {
        let len = field.encoded_len();
        if len > capacity_for(chunk_type, false) {
            return Err(Error::Cube(cube_core::Error::FieldSize {
                needed: len,
                available: capacity_for(chunk_type, false),
            }));
        }
        if used + len > capacity {
            chunks.push(Vec::new());
            chunk_type = CubeType::Frozen;
            capacity = capacity_for(chunk_type, true);
            used = 0;
        }
        chunks.last_mut().unwrap().push(field.clone());
        used += len;
    }
    Ok(chunks)
}

/// Split, optionally encrypt, and compile `fields` into a chained Veritum
/// (spec §4.4 `compile`).
pub async fn compile(fields: Vec<Field>, opts: CompileOptions) -> Result<Veritum> {
    let encrypted = !opts.recipients.is_empty();
    let chunk_field_sets = if encrypted {
        let sender_signing_key = opts
            .sender_signing_key
            .as_ref()
            .ok_or(Error::MissingEncryptionMaterial)?;
        let (sender_secret, sender_public) = crypto::sender_x25519_keypair(sender_signing_key);

        let mut plaintext = Vec::new();
        for f in &fields {
            encode_field(f, &mut plaintext)?;
        }
        let blob = crypto::seal(&plaintext, &sender_secret, &sender_public, &opts.recipients)?;

        // Split the envelope across as many ENCRYPTED fields as needed;
        // each chunk's worth is independent of the original field
        // boundaries (spec §4.4: "Encryption ... replaces plaintext
        // fields with a single ENCRYPTED field before chunking").
        let max_value = 1023usize;
        let mut encrypted_fields = Vec::new();
        for piece in blob.chunks(max_value) {
            encrypted_fields.push(Field::new(FieldType::Encrypted, piece.to_vec())?);
        }
        bin_pack(&encrypted_fields, opts.root_type)?
    } else {
        bin_pack(&fields, opts.root_type)?
    };

    if chunk_field_sets.is_empty() {
        return Err(Error::Empty);
    }

    let chunk_count = chunk_field_sets.len();
    let mut chunks: Vec<Cube> = Vec::with_capacity(chunk_count);
    let mut next_key: Option<CubeKey> = None;

    // Built back-to-front: the tail chunk is compiled first so its key is
    // known before its predecessor's CONTINUED_IN is written.
    for (i, mut body_fields) in chunk_field_sets.into_iter().enumerate().rev() {
        let is_root = i == 0;
        let cube_type = if is_root { opts.root_type } else { CubeType::Frozen };
        if let Some(successor) = next_key {
            body_fields.push(Relationship::new(RelationshipType::ContinuedIn, *successor.as_bytes()).to_field());
        }
        let keys = if is_root {
            opts.keys.clone()
        } else {
            CubeKeys::default()
        };
        let mut cube = Cube::create(cube_type, body_fields, keys, opts.required_difficulty)?;
        if let Some(date) = opts.date {
            cube.set_date(date);
        }
        cube.compile(CancelToken::new()).await?;
        next_key = Some(cube.get_key()?);
        chunks.push(cube);
    }
    chunks.reverse();

    let fields = concatenate_payload_fields(&chunks)?;
    Ok(Veritum {
        chunks,
        fields,
        encrypted,
        decrypted: !encrypted,
    })
}

fn concatenate_payload_fields(chunks: &[Cube]) -> Result<Vec<Field>> {
    let mut out = Vec::new();
    for chunk in chunks {
        for field in chunk.fields()? {
            if field.field_type == FieldType::RelatesTo {
                if let Some(rel) = Relationship::from_field(&field) {
                    if rel.rel_type == RelationshipType::ContinuedIn {
                        continue;
                    }
                }
            }
            out.push(field);
        }
    }
    Ok(out)
}

/// Reassemble a Veritum from an already-fetched chunk chain (spec §4.4
/// `FromChunks`). `chunks` must be in chain order starting at the seed.
/// If the final chunk still carries a `CONTINUED_IN` (i.e. the chain was
/// truncated before reaching its end), decryption fails closed: no
/// plaintext is ever surfaced for a partial ciphertext.
pub fn from_chunks(chunks: Vec<Cube>, opts: DecodeOptions) -> Result<Veritum> {
    if chunks.is_empty() {
        return Err(Error::Empty);
    }
    let truncated = chunks
        .last()
        .unwrap()
        .fields()?
        .iter()
        .filter_map(Relationship::from_field)
        .any(|rel| rel.rel_type == RelationshipType::ContinuedIn);

    let concatenated = concatenate_payload_fields(&chunks)?;
    let encrypted_blob: Vec<u8> = concatenated
        .iter()
        .filter(|f| f.field_type == FieldType::Encrypted)
        .flat_map(|f| f.value.clone())
        .collect();
    let encrypted = !encrypted_blob.is_empty();

    if !encrypted {
        return Ok(Veritum {
            chunks,
            fields: concatenated,
            encrypted: false,
            decrypted: true,
        });
    }

    if truncated {
        return Ok(Veritum {
            chunks,
            fields: concatenated,
            encrypted: true,
            decrypted: false,
        });
    }

    let Some(recipient_secret) = opts.recipient_private_key else {
        return Ok(Veritum {
            chunks,
            fields: concatenated,
            encrypted: true,
            decrypted: false,
        });
    };

    match crypto::open(&encrypted_blob, &recipient_secret) {
        Ok(plaintext) => {
            let fields = decode_body(&plaintext)?;
            Ok(Veritum {
                chunks,
                fields,
                encrypted: true,
                decrypted: true,
            })
        }
        Err(_) => Ok(Veritum {
            chunks,
            fields: concatenated,
            encrypted: true,
            decrypted: false,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    #[tokio::test]
    async fn single_chunk_plain_round_trip() {
        let fields = vec![Field::payload(b"single chunk veritum".to_vec()).unwrap()];
        let opts = CompileOptions::plain(CubeType::Frozen, CubeKeys::default(), 0);
        let veritum = compile(fields, opts).await.unwrap();
        assert_eq!(veritum.chunks.len(), 1);
        assert_eq!(veritum.payload(), b"single chunk veritum");
    }

    #[tokio::test]
    async fn multi_chunk_frozen_chain_round_trip() {
        let big_payload = vec![0x5Au8; 2000];
        let fields = vec![Field::payload(big_payload.clone()).unwrap()];
        let opts = CompileOptions::plain(CubeType::Frozen, CubeKeys::default(), 0);
        let veritum = compile(fields, opts).await.unwrap();
        assert!(veritum.chunks.len() >= 2);

        let reassembled = from_chunks(veritum.chunks, DecodeOptions::default()).unwrap();
        assert_eq!(reassembled.payload(), big_payload);
    }

    #[tokio::test]
    async fn truncated_chain_yields_prefix_only() {
        let big_payload = vec![0x11u8; 1800];
        let fields = vec![Field::payload(big_payload).unwrap()];
        let opts = CompileOptions::plain(CubeType::Frozen, CubeKeys::default(), 0);
        let mut veritum = compile(fields, opts).await.unwrap();
        assert!(veritum.chunks.len() >= 2);
        veritum.chunks.truncate(1);

        let reassembled = from_chunks(veritum.chunks, DecodeOptions::default()).unwrap();
        assert!(reassembled.payload().len() < 1800);
    }

    #[tokio::test]
    async fn encrypted_veritum_round_trips_for_recipient() {
        let sender_signing = SigningKey::from_bytes(&[21u8; 32]);
        let recipient_signing = SigningKey::from_bytes(&[22u8; 32]);
        let (recipient_secret, recipient_public) = crypto::sender_x25519_keypair(&recipient_signing);

        let fields = vec![Field::payload(b"for your eyes only".to_vec()).unwrap()];
        let opts = CompileOptions::plain(CubeType::Frozen, CubeKeys::default(), 0)
            .with_recipients(sender_signing, vec![recipient_public]);
        let veritum = compile(fields, opts).await.unwrap();
        assert!(veritum.encrypted);

        let opened = from_chunks(
            veritum.chunks,
            DecodeOptions {
                recipient_private_key: Some(recipient_secret),
            },
        )
        .unwrap();
        assert!(opened.decrypted);
        assert_eq!(opened.payload(), b"for your eyes only");
    }

    #[tokio::test]
    async fn encrypted_veritum_without_key_stays_opaque() {
        let sender_signing = SigningKey::from_bytes(&[23u8; 32]);
        let recipient_signing = SigningKey::from_bytes(&[24u8; 32]);
        let (_, recipient_public) = crypto::sender_x25519_keypair(&recipient_signing);

        let fields = vec![Field::payload(b"classified".to_vec()).unwrap()];
        let opts = CompileOptions::plain(CubeType::Frozen, CubeKeys::default(), 0)
            .with_recipients(sender_signing, vec![recipient_public]);
        let veritum = compile(fields, opts).await.unwrap();

        let opened = from_chunks(veritum.chunks, DecodeOptions::default()).unwrap();
        assert!(!opened.decrypted);
        assert!(opened.payload().is_empty());
    }

    #[tokio::test]
    async fn muc_root_with_frozen_continuation_chunks() {
        let signing_key = SigningKey::from_bytes(&[25u8; 32]);
        let big_payload = vec![0x99u8; 1500];
        let fields = vec![Field::payload(big_payload.clone()).unwrap()];
        let opts = CompileOptions::plain(CubeType::Muc, CubeKeys::signed(signing_key), 0);
        let veritum = compile(fields, opts).await.unwrap();
        assert!(veritum.chunks.len() >= 2);
        assert_eq!(veritum.chunks[0].cube_type(), CubeType::Muc);
        for chunk in &veritum.chunks[1..] {
            assert_eq!(chunk.cube_type(), CubeType::Frozen);
        }
    }
}
