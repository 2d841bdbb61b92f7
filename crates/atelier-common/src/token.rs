//! Token types

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::util::unix_time;

/// Ledger collection identifier
///
/// Opaque to this service; the ledger assigns sequential serial numbers
/// within a collection.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(String);

impl CollectionId {
    /// Create a new [`CollectionId`]
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Identifier as str
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CollectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Ledger token identifier: a collection plus a serial number
///
/// Persisted and displayed as `<collection>/<serial>`, which is also the
/// form explorer links are derived from.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct TokenId {
    /// Collection the token was minted into
    pub collection: CollectionId,
    /// Serial number within the collection
    pub serial: u64,
}

impl TokenId {
    /// Create a new [`TokenId`]
    pub fn new(collection: CollectionId, serial: u64) -> Self {
        Self { collection, serial }
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.serial)
    }
}

impl FromStr for TokenId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (collection, serial) = s
            .rsplit_once('/')
            .ok_or_else(|| crate::Error::InvalidTokenId(s.to_string()))?;
        if collection.is_empty() {
            return Err(crate::Error::InvalidTokenId(s.to_string()));
        }
        let serial = serial
            .parse::<u64>()
            .map_err(|_| crate::Error::InvalidTokenId(s.to_string()))?;
        Ok(TokenId::new(CollectionId::new(collection), serial))
    }
}

impl Serialize for TokenId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TokenId::from_str(&s).map_err(D::Error::custom)
    }
}

/// Record of the first mint: the authenticity certificate
///
/// Written exactly once per order. Its existence is the signal that the
/// first saga step completed; it is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticityToken {
    /// Row id
    pub id: Uuid,
    /// Order this certificate belongs to (unique)
    pub order_id: Uuid,
    /// Ledger token id
    pub token_id: TokenId,
    /// Ledger transaction id of the mint
    pub transaction_id: String,
    /// Pinned metadata URL
    pub metadata_url: String,
    /// Marker identifying the minting service account
    pub minted_by: String,
    /// Unix time the record was written
    pub created_time: u64,
}

impl AuthenticityToken {
    /// Create a new [`AuthenticityToken`]
    pub fn new(
        order_id: Uuid,
        token_id: TokenId,
        transaction_id: String,
        metadata_url: String,
        minted_by: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            token_id,
            transaction_id,
            metadata_url,
            minted_by,
            created_time: unix_time(),
        }
    }
}

/// Record of the second mint: the transferable ownership token
///
/// Written exactly once per order, only after the authenticity record
/// exists. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipToken {
    /// Row id
    pub id: Uuid,
    /// Order this token belongs to (unique)
    pub order_id: Uuid,
    /// The authenticity record this token attests to
    pub authenticity_id: Uuid,
    /// Ledger token id
    pub token_id: TokenId,
    /// Ledger transaction id of the mint
    pub transaction_id: String,
    /// Pinned metadata URL
    pub metadata_url: String,
    /// Whether the token may be transferred on-ledger
    pub transferable: bool,
    /// Number of fractions the ownership is split into
    pub fraction_count: u32,
    /// Current owner (the buyer at mint time)
    pub owner_id: Uuid,
    /// Unix time the record was written
    pub created_time: u64,
}

impl OwnershipToken {
    /// Build the [`OwnershipToken`] row from a persisted mint receipt
    ///
    /// Ownership is transferable and whole (one fraction) at mint time.
    pub fn from_receipt(
        receipt: &PendingOwnershipReceipt,
        authenticity_id: Uuid,
        owner_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: receipt.order_id,
            authenticity_id,
            token_id: receipt.token_id.clone(),
            transaction_id: receipt.transaction_id.clone(),
            metadata_url: receipt.metadata_url.clone(),
            transferable: true,
            fraction_count: 1,
            owner_id,
            created_time: unix_time(),
        }
    }
}

/// Ownership mint receipt persisted before the finalize transaction
///
/// The ledger is the source of truth for a mint; the local database is a
/// cache of it. Persisting the receipt in the same step as the mint means a
/// failure in the purely local finalize transaction can be replayed without
/// minting or pinning anything again. Deleted by the finalize transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOwnershipReceipt {
    /// Order the receipt belongs to (unique)
    pub order_id: Uuid,
    /// Ledger token id of the ownership mint
    pub token_id: TokenId,
    /// Ledger transaction id of the ownership mint
    pub transaction_id: String,
    /// Pinned ownership metadata URL
    pub metadata_url: String,
    /// Unix time the receipt was written
    pub created_time: u64,
}

impl PendingOwnershipReceipt {
    /// Create a new [`PendingOwnershipReceipt`]
    pub fn new(order_id: Uuid, token_id: TokenId, transaction_id: String, metadata_url: String) -> Self {
        Self {
            order_id,
            token_id,
            transaction_id,
            metadata_url,
            created_time: unix_time(),
        }
    }
}
