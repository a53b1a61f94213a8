//! The Cube: a fixed 1024-byte content-addressed record (spec §3, §4.2).

use crate::crypto;
use crate::error::{Error, Result};
use crate::field::{decode_body, encode_field, Field, FieldType};
use ed25519_dalek::{SigningKey, VerifyingKey};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub const CUBE_SIZE: usize = 1024;

/// 32-byte content-addressed key. Shared key space with `NotificationKey`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CubeKey(pub [u8; 32]);

impl CubeKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for CubeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CubeKey({})", self.to_hex())
    }
}

/// Same 32-byte space as `CubeKey` (spec §3).
pub type NotificationKey = CubeKey;

/// The eight Cube lifecycle × notification variants (spec §3, §6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CubeType {
    Frozen = 0,
    Pic = 1,
    Muc = 2,
    Pmuc = 3,
    FrozenNotify = 4,
    PicNotify = 5,
    MucNotify = 6,
    PmucNotify = 7,
}

/// Independent lifecycle dimension of a `CubeType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Frozen,
    Pic,
    Muc,
    Pmuc,
}

impl CubeType {
    pub fn from_byte(version_and_type: u8) -> Result<Self> {
        let version = version_and_type >> 4;
        if version != 0 {
            return Err(Error::UnknownType(version_and_type));
        }
        let type_nibble = version_and_type & 0x0F;
        use CubeType::*;
        Ok(match type_nibble {
            0 => Frozen,
            1 => Pic,
            2 => Muc,
            3 => Pmuc,
            4 => FrozenNotify,
            5 => PicNotify,
            6 => MucNotify,
            7 => PmucNotify,
            _ => return Err(Error::UnknownType(version_and_type)),
        })
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }

    pub fn lifecycle(self) -> Lifecycle {
        use CubeType::*;
        match self {
            Frozen | FrozenNotify => Lifecycle::Frozen,
            Pic | PicNotify => Lifecycle::Pic,
            Muc | MucNotify => Lifecycle::Muc,
            Pmuc | PmucNotify => Lifecycle::Pmuc,
        }
    }

    pub fn is_notify(self) -> bool {
        use CubeType::*;
        matches!(self, FrozenNotify | PicNotify | MucNotify | PmucNotify)
    }

    pub fn is_signed(self) -> bool {
        matches!(self.lifecycle(), Lifecycle::Muc | Lifecycle::Pmuc)
    }

    pub fn is_pmuc(self) -> bool {
        matches!(self.lifecycle(), Lifecycle::Pmuc)
    }

    pub fn is_immutable(self) -> bool {
        matches!(self.lifecycle(), Lifecycle::Frozen | Lifecycle::Pic)
    }
}

/// Fixed byte offsets for a given `CubeType`'s field definition (spec §6).
#[derive(Clone, Copy, Debug)]
pub struct Layout {
    pub public_key_offset: Option<usize>,
    pub notify_offset: Option<usize>,
    pub body_start: usize,
    pub body_end: usize,
    pub date_offset: usize,
    pub signature_offset: Option<usize>,
    pub pmuc_update_count_offset: Option<usize>,
    pub nonce_offset: usize,
}

impl Layout {
    pub fn for_type(cube_type: CubeType) -> Self {
        let signed = cube_type.is_signed();
        let notify = cube_type.is_notify();
        let pmuc = cube_type.is_pmuc();

        let mut front = 1usize; // TYPE
        let public_key_offset = if signed {
            let o = front;
            front += 32;
            Some(o)
        } else {
            None
        };
        let notify_offset = if notify {
            let o = front;
            front += 32;
            Some(o)
        } else {
            None
        };

        let mut trailer_len = 5usize; // DATE
        if signed {
            trailer_len += 64;
        }
        if pmuc {
            trailer_len += 4;
        }
        trailer_len += 4; // NONCE

        let body_start = front;
        let body_end = CUBE_SIZE - trailer_len;

        let mut off = body_end;
        let date_offset = off;
        off += 5;
        let signature_offset = if signed {
            let o = off;
            off += 64;
            Some(o)
        } else {
            None
        };
        let pmuc_update_count_offset = if pmuc {
            let o = off;
            off += 4;
            Some(o)
        } else {
            None
        };
        let nonce_offset = off;
        debug_assert_eq!(nonce_offset, CUBE_SIZE - 4);

        Layout {
            public_key_offset,
            notify_offset,
            body_start,
            body_end,
            date_offset,
            signature_offset,
            pmuc_update_count_offset,
            nonce_offset,
        }
    }
}

/// Signing/notification material required to compile a given `CubeType`.
#[derive(Clone, Default)]
pub struct CubeKeys {
    pub signing_key: Option<SigningKey>,
    pub notify_recipient: Option<[u8; 32]>,
}

impl CubeKeys {
    pub fn signed(signing_key: SigningKey) -> Self {
        Self {
            signing_key: Some(signing_key),
            notify_recipient: None,
        }
    }

    pub fn with_notify(mut self, recipient: [u8; 32]) -> Self {
        self.notify_recipient = Some(recipient);
        self
    }
}

/// A cheap, positional-only view over a compiled binary: never interprets
/// the variable body as TLV (spec §4.1(e) CPU-exhaustion guard).
#[derive(Clone, Copy, Debug)]
pub struct CoreView<'a> {
    pub cube_type: CubeType,
    pub public_key: Option<&'a [u8; 32]>,
    pub notify: Option<&'a [u8; 32]>,
    pub date: u64,
    pub signature: Option<&'a [u8; 64]>,
    pub update_count: Option<u32>,
    pub nonce: &'a [u8; 4],
}

fn array_ref<'a, const N: usize>(bytes: &'a [u8], offset: usize) -> &'a [u8; N] {
    (&bytes[offset..offset + N]).try_into().unwrap()
}

/// Byte range covered by a signature: everything up to SIGNATURE, then
/// everything between SIGNATURE and NONCE (i.e. PMUC_UPDATE_COUNT when
/// present). SIGNATURE and NONCE themselves are excluded (spec §4.2, §8).
fn signed_message(binary: &[u8], sig_offset: usize, nonce_offset: usize) -> Vec<u8> {
    let mut message = Vec::with_capacity(binary.len());
    message.extend_from_slice(&binary[..sig_offset]);
    message.extend_from_slice(&binary[sig_offset + 64..nonce_offset]);
    message
}

fn read_date(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf[3..8].copy_from_slice(&bytes[offset..offset + 5]);
    u64::from_be_bytes(buf)
}

fn write_date(bytes: &mut [u8], offset: usize, value: u64) {
    let full = value.to_be_bytes();
    bytes[offset..offset + 5].copy_from_slice(&full[3..8]);
}

/// Parse only the fixed positional fields of a compiled 1024-byte frame.
pub fn parse_core(binary: &[u8; CUBE_SIZE]) -> Result<CoreView<'_>> {
    let cube_type = CubeType::from_byte(binary[0])?;
    let layout = Layout::for_type(cube_type);
    let public_key = layout.public_key_offset.map(|o| array_ref::<32>(binary, o));
    let notify = layout.notify_offset.map(|o| array_ref::<32>(binary, o));
    let date = read_date(binary, layout.date_offset);
    let signature = layout.signature_offset.map(|o| array_ref::<64>(binary, o));
    let update_count = layout
        .pmuc_update_count_offset
        .map(|o| u32::from_be_bytes(*array_ref::<4>(binary, o)));
    let nonce = array_ref::<4>(binary, layout.nonce_offset);
    Ok(CoreView {
        cube_type,
        public_key,
        notify,
        date,
        signature,
        update_count,
        nonce,
    })
}

/// Insert or resize a single PADDING (or CCI_END, if exactly one byte is
/// needed) field so `fields` encodes to exactly `capacity` bytes.
/// Returns whether a padding field was added/changed.
pub fn pad_fields_to_fit(fields: &mut Vec<Field>, capacity: usize) -> Result<bool> {
    fields.retain(|f| f.field_type != FieldType::Padding && f.field_type != FieldType::CciEnd);
    let used: usize = fields.iter().map(|f| f.encoded_len()).sum();
    if used > capacity {
        return Err(Error::FieldSize {
            needed: used,
            available: capacity,
        });
    }
    let remaining = capacity - used;
    if remaining == 0 {
        return Ok(false);
    }
    if remaining == 1 {
        fields.push(Field {
            field_type: FieldType::CciEnd,
            value: vec![],
        });
        return Ok(true);
    }
    let value_len = remaining - 2;
    fields.push(Field::new(FieldType::Padding, vec![0u8; value_len])?);
    Ok(true)
}

/// Cooperative cancellation flag for long-running mining (spec §5).
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

enum State {
    Uncompiled { date_override: Option<u64> },
    Compiled {
        binary: Box<[u8; CUBE_SIZE]>,
        key: CubeKey,
    },
}

/// A Cube in either its uncompiled (editable fields) or compiled
/// (1024-byte binary, key derived) state (spec §3 "Lifecycle").
pub struct Cube {
    cube_type: CubeType,
    fields: Vec<Field>,
    keys: CubeKeys,
    required_difficulty: u32,
    state: State,
}

impl Cube {
    /// Create an uncompiled Cube (spec §4.2 `Create`).
    pub fn create(
        cube_type: CubeType,
        fields: Vec<Field>,
        keys: CubeKeys,
        required_difficulty: u32,
    ) -> Result<Self> {
        if cube_type.is_signed() && keys.signing_key.is_none() {
            return Err(Error::InvalidSignature);
        }
        if cube_type.is_notify() && keys.notify_recipient.is_none() {
            return Err(Error::BadNotify);
        }
        for f in &fields {
            if matches!(
                f.field_type,
                FieldType::Type
                    | FieldType::PublicKey
                    | FieldType::Notify
                    | FieldType::Date
                    | FieldType::Signature
                    | FieldType::PmucUpdateCount
                    | FieldType::Nonce
            ) {
                // Positional fields are managed by compile(), not supplied by callers.
                return Err(Error::FieldSize {
                    needed: 0,
                    available: 0,
                });
            }
        }
        Ok(Self {
            cube_type,
            fields,
            keys,
            required_difficulty,
            state: State::Uncompiled { date_override: None },
        })
    }

    pub fn cube_type(&self) -> CubeType {
        self.cube_type
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self.state, State::Compiled { .. })
    }

    pub fn set_date(&mut self, t: u64) {
        match &mut self.state {
            State::Uncompiled { date_override } => *date_override = Some(t),
            State::Compiled { binary, .. } => {
                let layout = Layout::for_type(self.cube_type);
                write_date(binary.as_mut_slice(), layout.date_offset, t);
            }
        }
    }

    pub fn get_date(&self) -> Option<u64> {
        match &self.state {
            State::Uncompiled { date_override } => *date_override,
            State::Compiled { binary, .. } => {
                let layout = Layout::for_type(self.cube_type);
                Some(read_date(binary.as_slice(), layout.date_offset))
            }
        }
    }

    /// Body-level fields as supplied by the caller (uncompiled), or the
    /// fully decoded TLV body of a compiled binary.
    pub fn fields(&self) -> Result<Vec<Field>> {
        match &self.state {
            State::Uncompiled { .. } => Ok(self.fields.clone()),
            State::Compiled { binary, .. } => {
                let layout = Layout::for_type(self.cube_type);
                Ok(decode_body(&binary[layout.body_start..layout.body_end])?)
            }
        }
    }

    pub fn first_of_type(&self, field_type: FieldType) -> Result<Option<Field>> {
        Ok(self
            .fields()?
            .into_iter()
            .find(|f| f.field_type == field_type))
    }

    pub fn get_key(&self) -> Result<CubeKey> {
        match &self.state {
            State::Uncompiled { .. } => Err(Error::NotCompiled),
            State::Compiled { key, .. } => Ok(*key),
        }
    }

    pub fn get_hash(&self) -> Result<[u8; 32]> {
        match &self.state {
            State::Uncompiled { .. } => Err(Error::NotCompiled),
            State::Compiled { binary, .. } => Ok(crypto::sha3_256(binary.as_slice())),
        }
    }

    pub fn binary(&self) -> Option<&[u8; CUBE_SIZE]> {
        match &self.state {
            State::Uncompiled { .. } => None,
            State::Compiled { binary, .. } => Some(binary),
        }
    }

    pub fn get_update_count(&self) -> Option<u32> {
        match &self.state {
            State::Uncompiled { .. } => None,
            State::Compiled { binary, .. } => {
                let layout = Layout::for_type(self.cube_type);
                layout
                    .pmuc_update_count_offset
                    .map(|o| u32::from_be_bytes(*array_ref::<4>(binary.as_slice(), o)))
            }
        }
    }

    /// Set the PMUC update count; only meaningful before compile (for a
    /// fresh build) or via `recompile_with_update_count` after the fact.
    pub fn set_update_count(&mut self, count: u32) -> Result<()> {
        match &mut self.state {
            State::Uncompiled { .. } => {
                self.fields.push(Field {
                    field_type: FieldType::PmucUpdateCount,
                    value: count.to_be_bytes().to_vec(),
                });
                Ok(())
            }
            State::Compiled { .. } => Err(Error::FieldSize {
                needed: 0,
                available: 0,
            }),
        }
    }

    /// Reopen a compiled Cube for in-place field rewrites: decodes the
    /// current body back into editable fields (preserving the date and
    /// PMUC update count) and drops back to the `Uncompiled` state. The
    /// caller must `compile()` again afterward (spec §3 "Lifecycle").
    pub fn begin_edit(&mut self) -> Result<()> {
        let State::Compiled { binary, .. } = &self.state else {
            return Ok(());
        };
        let layout = Layout::for_type(self.cube_type);
        let date = read_date(binary.as_slice(), layout.date_offset);
        let update_count = layout
            .pmuc_update_count_offset
            .map(|o| u32::from_be_bytes(*array_ref::<4>(binary.as_slice(), o)));
        let mut fields: Vec<Field> = decode_body(&binary[layout.body_start..layout.body_end])?
            .into_iter()
            .filter(|f| !matches!(f.field_type, FieldType::Padding | FieldType::CciEnd))
            .collect();
        if let Some(count) = update_count {
            fields.push(Field {
                field_type: FieldType::PmucUpdateCount,
                value: count.to_be_bytes().to_vec(),
            });
        }
        self.fields = fields;
        self.state = State::Uncompiled {
            date_override: Some(date),
        };
        Ok(())
    }

    /// Replace the first field of `field.field_type` (or append it) while
    /// editing an uncompiled Cube.
    pub fn set_field(&mut self, field: Field) {
        if let Some(slot) = self.fields.iter_mut().find(|f| f.field_type == field.field_type) {
            *slot = field;
        } else {
            self.fields.push(field);
        }
    }

    fn pending_update_count(&self) -> Option<u32> {
        self.fields
            .iter()
            .find(|f| f.field_type == FieldType::PmucUpdateCount)
            .and_then(|f| f.as_u32_be())
    }

    /// Compile: materialize the positional trailer, pad the body, sign
    /// (if applicable), and mine the nonce (spec §4.2 `compile`).
    pub async fn compile(&mut self, cancel: CancelToken) -> Result<&[u8; CUBE_SIZE]> {
        let layout = Layout::for_type(self.cube_type);
        let mut body_fields: Vec<Field> = self
            .fields
            .iter()
            .cloned()
            .filter(|f| f.field_type != FieldType::PmucUpdateCount)
            .collect();
        let capacity = layout.body_end - layout.body_start;
        pad_fields_to_fit(&mut body_fields, capacity)?;

        let mut binary = [0u8; CUBE_SIZE];
        binary[0] = self.cube_type.to_byte();
        if let Some(o) = layout.public_key_offset {
            let signing_key = self.keys.signing_key.as_ref().expect("signed cube requires a key");
            binary[o..o + 32].copy_from_slice(signing_key.verifying_key().as_bytes());
        }
        if let Some(o) = layout.notify_offset {
            let recipient = self.keys.notify_recipient.expect("notify cube requires a recipient");
            binary[o..o + 32].copy_from_slice(&recipient);
        }
        let mut body_buf = Vec::with_capacity(capacity);
        for f in &body_fields {
            encode_field(f, &mut body_buf)?;
        }
        if body_buf.len() > capacity {
            return Err(Error::FieldSize {
                needed: body_buf.len(),
                available: capacity,
            });
        }
        binary[layout.body_start..layout.body_start + body_buf.len()].copy_from_slice(&body_buf);

        let date = match &self.state {
            State::Uncompiled { date_override } => date_override.unwrap_or_else(now_secs),
            State::Compiled { .. } => now_secs(),
        };
        write_date(&mut binary, layout.date_offset, date);

        if let Some(o) = layout.pmuc_update_count_offset {
            let count = self.pending_update_count().unwrap_or(0);
            binary[o..o + 4].copy_from_slice(&count.to_be_bytes());
        }

        if let Some(sig_offset) = layout.signature_offset {
            let signing_key = self.keys.signing_key.clone().expect("signed cube requires a key");
            let message = signed_message(&binary, sig_offset, layout.nonce_offset);
            let sig = crypto::sign(&signing_key, &message);
            binary[sig_offset..sig_offset + 64].copy_from_slice(&sig);
        }

        mine_nonce(&mut binary, layout.nonce_offset, self.required_difficulty, &cancel).await?;

        let key = derive_key(self.cube_type, &binary, &layout);
        self.state = State::Compiled {
            binary: Box::new(binary),
            key,
        };
        match &self.state {
            State::Compiled { binary, .. } => Ok(binary.as_ref()),
            State::Uncompiled { .. } => unreachable!(),
        }
    }

    /// Validate hashcash, signature, length, and PMUC invariants (spec §4.2).
    pub fn validate(&self) -> bool {
        let State::Compiled { binary, .. } = &self.state else {
            return false;
        };
        if binary.len() != CUBE_SIZE {
            return false;
        }
        let layout = Layout::for_type(self.cube_type);
        let hash = crypto::sha3_256(binary.as_slice());
        if crypto::trailing_zero_bits(&hash) < self.required_difficulty {
            return false;
        }
        if let Some(sig_offset) = layout.signature_offset {
            let public_key = match layout.public_key_offset {
                Some(o) => array_ref::<32>(binary.as_slice(), o),
                None => return false,
            };
            let message = signed_message(binary.as_slice(), sig_offset, layout.nonce_offset);
            let signature = array_ref::<64>(binary.as_slice(), sig_offset);
            if VerifyingKey::from_bytes(public_key).is_err() {
                return false;
            }
            if !crypto::verify(public_key, &message, signature) {
                return false;
            }
        }
        if self.cube_type.is_notify() {
            if layout.notify_offset.is_none() {
                return false;
            }
        }
        true
    }

    /// Parse a compiled binary back into a `Cube` (spec §8 "Binary round-trip").
    pub fn from_binary(binary: [u8; CUBE_SIZE], required_difficulty: u32) -> Result<Self> {
        let cube_type = CubeType::from_byte(binary[0])?;
        let layout = Layout::for_type(cube_type);
        let key = derive_key(cube_type, &binary, &layout);
        Ok(Self {
            cube_type,
            fields: Vec::new(),
            keys: CubeKeys::default(),
            required_difficulty,
            state: State::Compiled {
                binary: Box::new(binary),
                key,
            },
        })
    }
}

fn derive_key(cube_type: CubeType, binary: &[u8; CUBE_SIZE], layout: &Layout) -> CubeKey {
    match cube_type.lifecycle() {
        Lifecycle::Frozen => CubeKey(crypto::sha3_256(binary.as_slice())),
        Lifecycle::Pic => CubeKey(crypto::sha3_256(&binary[..layout.date_offset])),
        Lifecycle::Muc | Lifecycle::Pmuc => {
            let o = layout.public_key_offset.expect("signed variant has a public key");
            CubeKey(*array_ref::<32>(binary, o))
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

async fn mine_nonce(
    binary: &mut [u8; CUBE_SIZE],
    nonce_offset: usize,
    required_difficulty: u32,
    cancel: &CancelToken,
) -> Result<()> {
    const YIELD_EVERY: u32 = 4096;
    let mut nonce: u32 = 0;
    loop {
        binary[nonce_offset..nonce_offset + 4].copy_from_slice(&nonce.to_be_bytes());
        let hash = crypto::sha3_256(binary.as_slice());
        if crypto::trailing_zero_bits(&hash) >= required_difficulty {
            return Ok(());
        }
        if nonce == u32::MAX {
            // Proof space exhausted for this trailer; spec notes the 4-byte
            // scratchpad bounds effective mining difficulty (§9 Open Questions).
            return Err(Error::InsufficientHashcash {
                needed: required_difficulty,
                got: 0,
            });
        }
        nonce += 1;
        if nonce % YIELD_EVERY == 0 {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            tokio::task::yield_now().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;

    fn frozen_cube(payload: &[u8], difficulty: u32) -> Cube {
        let fields = vec![Field::payload(payload.to_vec()).unwrap()];
        Cube::create(CubeType::Frozen, fields, CubeKeys::default(), difficulty).unwrap()
    }

    #[tokio::test]
    async fn compile_then_validate_frozen() {
        let mut cube = frozen_cube(b"Cubus demonstrativus", 0);
        cube.compile(CancelToken::new()).await.unwrap();
        assert!(cube.validate());
        assert_eq!(cube.binary().unwrap().len(), CUBE_SIZE);
    }

    #[tokio::test]
    async fn frozen_key_is_hash_of_whole_binary() {
        let mut cube = frozen_cube(b"hello", 0);
        cube.compile(CancelToken::new()).await.unwrap();
        let binary = *cube.binary().unwrap();
        let key = cube.get_key().unwrap();
        assert_eq!(key.0, crypto::sha3_256(&binary));
    }

    #[tokio::test]
    async fn pic_key_excludes_date_and_nonce() {
        let fields = vec![Field::payload(b"pic payload".to_vec()).unwrap()];
        let mut cube = Cube::create(CubeType::Pic, fields, CubeKeys::default(), 0).unwrap();
        cube.compile(CancelToken::new()).await.unwrap();
        let binary = *cube.binary().unwrap();
        let layout = Layout::for_type(CubeType::Pic);
        let expected = crypto::sha3_256(&binary[..layout.date_offset]);
        assert_eq!(cube.get_key().unwrap().0, expected);
    }

    #[tokio::test]
    async fn muc_key_is_public_key() {
        let signing_key = SigningKey::from_bytes(&[3u8; 32]);
        let public = signing_key.verifying_key().to_bytes();
        let fields = vec![Field::new(FieldType::Application, b"ID".to_vec()).unwrap()];
        let mut cube = Cube::create(CubeType::Muc, fields, CubeKeys::signed(signing_key), 0).unwrap();
        cube.compile(CancelToken::new()).await.unwrap();
        assert_eq!(cube.get_key().unwrap().0, public);
    }

    #[tokio::test]
    async fn binary_round_trip() {
        let mut cube = frozen_cube(b"round trip", 0);
        cube.compile(CancelToken::new()).await.unwrap();
        let binary = *cube.binary().unwrap();
        let key = cube.get_key().unwrap();

        let reparsed = Cube::from_binary(binary, 0).unwrap();
        assert_eq!(reparsed.binary().unwrap(), &binary);
        assert_eq!(reparsed.get_key().unwrap(), key);
    }

    #[tokio::test]
    async fn notify_cube_carries_recipient() {
        let fields = vec![Field::payload(b"notify me".to_vec()).unwrap()];
        let recipient = [0x42u8; 32];
        let keys = CubeKeys::default().with_notify(recipient);
        let mut cube = Cube::create(CubeType::FrozenNotify, fields, keys, 0).unwrap();
        cube.compile(CancelToken::new()).await.unwrap();
        assert!(cube.validate());
        let binary = cube.binary().unwrap();
        let core = parse_core(binary).unwrap();
        assert_eq!(core.notify, Some(&recipient));
    }

    #[tokio::test]
    async fn pmuc_update_count_round_trips() {
        let signing_key = SigningKey::from_bytes(&[5u8; 32]);
        let fields = vec![Field::payload(b"pmuc".to_vec()).unwrap()];
        let mut cube = Cube::create(CubeType::Pmuc, fields, CubeKeys::signed(signing_key), 0).unwrap();
        cube.set_update_count(7).unwrap();
        cube.compile(CancelToken::new()).await.unwrap();
        assert_eq!(cube.get_update_count(), Some(7));
    }

    #[tokio::test]
    async fn edit_and_recompile_changes_payload_but_not_key_for_muc() {
        let signing_key = SigningKey::from_bytes(&[11u8; 32]);
        let fields = vec![Field::payload(b"v1".to_vec()).unwrap()];
        let mut cube = Cube::create(CubeType::Muc, fields, CubeKeys::signed(signing_key.clone()), 0).unwrap();
        cube.compile(CancelToken::new()).await.unwrap();
        let key_before = cube.get_key().unwrap();

        cube.begin_edit().unwrap();
        cube.set_field(Field::payload(b"v2".to_vec()).unwrap());
        cube.compile(CancelToken::new()).await.unwrap();

        assert_eq!(cube.get_key().unwrap(), key_before);
        let payload = cube.first_of_type(FieldType::Payload).unwrap().unwrap();
        assert_eq!(payload.value, b"v2");
    }

    #[tokio::test]
    async fn hashcash_is_enforced() {
        let mut cube = frozen_cube(b"needs work", 4);
        cube.compile(CancelToken::new()).await.unwrap();
        let hash = cube.get_hash().unwrap();
        assert!(crypto::trailing_zero_bits(&hash) >= 4);
    }

    #[tokio::test]
    async fn signed_cube_validates_after_mining_changes_nonce() {
        let signing_key = SigningKey::from_bytes(&[9u8; 32]);
        let fields = vec![Field::payload(b"mined and signed".to_vec()).unwrap()];
        let mut cube = Cube::create(CubeType::Pmuc, fields, CubeKeys::signed(signing_key), 8).unwrap();
        cube.set_update_count(3).unwrap();
        cube.compile(CancelToken::new()).await.unwrap();

        let binary = *cube.binary().unwrap();
        assert!(cube.validate());

        let reparsed = Cube::from_binary(binary, 8).unwrap();
        assert!(reparsed.validate());
    }
}
