//! Relationship tags carried in RELATES_TO fields (spec §3).

/// 1-byte relationship type tag, paired with a 32-byte target key to form
/// a `RELATES_TO` field value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RelationshipType {
    ReplyTo = 0,
    Mention = 1,
    MyPost = 2,
    ContinuedIn = 3,
    Illustration = 4,
    KeyBackupCube = 5,
    SubscriptionRecommendation = 6,
    SubscriptionRecommendationIndex = 7,
}

impl RelationshipType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        use RelationshipType::*;
        Some(match tag {
            0 => ReplyTo,
            1 => Mention,
            2 => MyPost,
            3 => ContinuedIn,
            4 => Illustration,
            5 => KeyBackupCube,
            6 => SubscriptionRecommendation,
            7 => SubscriptionRecommendationIndex,
            _ => return None,
        })
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// A parsed relationship: tag + 32-byte target key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relationship {
    pub rel_type: RelationshipType,
    pub target: [u8; 32],
}

impl Relationship {
    pub fn new(rel_type: RelationshipType, target: [u8; 32]) -> Self {
        Self { rel_type, target }
    }

    /// Demarshal from a generic `RELATES_TO` field; returns `None` (not an
    /// error) when applied to an incompatible field, per spec §7
    /// `WrongFieldType` semantics for the lenient accessor.
    pub fn from_field(field: &crate::field::Field) -> Option<Self> {
        let (tag, target) = field.as_relationship()?;
        let rel_type = RelationshipType::from_tag(tag)?;
        Some(Self { rel_type, target })
    }

    pub fn to_field(self) -> crate::field::Field {
        crate::field::Field::relates_to(self.rel_type.tag(), self.target)
    }
}
