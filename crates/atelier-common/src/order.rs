//! Order types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::unix_time;

/// Currency of an order amount
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    /// US dollar
    Usd,
    /// Euro
    Eur,
    /// Pound sterling
    Gbp,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Usd => write!(f, "usd"),
            Currency::Eur => write!(f, "eur"),
            Currency::Gbp => write!(f, "gbp"),
        }
    }
}

impl FromStr for Currency {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "usd" => Ok(Currency::Usd),
            "eur" => Ok(Currency::Eur),
            "gbp" => Ok(Currency::Gbp),
            _ => Err(crate::Error::UnknownCurrency(s.to_string())),
        }
    }
}

/// Payment status of an order
///
/// Owned by the checkout flow. The fulfillment saga only ever reads it; an
/// order must be [`PaymentStatus::Paid`] before a mint job is enqueued.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Payment initiated, not yet confirmed
    Pending,
    /// Payment confirmed by the provider
    Paid,
    /// Payment refunded
    Refunded,
}

/// Fulfillment status of an order
///
/// Transitions are validated by [`crate::state::check_order_state_transition`].
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Checkout completed, mint job not yet picked up
    Created,
    /// Mint saga in flight
    Processing,
    /// Both tokens minted and linked
    Fulfilled,
    /// Authenticity mint exhausted its retries; neither token exists
    MintFailed,
    /// Ownership mint exhausted its retries; only the authenticity token exists
    OwnershipMintFailed,
    /// Both mints succeeded but the local link/finalize transaction failed
    LinkFailed,
}

impl OrderStatus {
    /// Whether an operator retry is currently allowed for this status
    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            OrderStatus::MintFailed | OrderStatus::OwnershipMintFailed | OrderStatus::LinkFailed
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Created => "created",
            OrderStatus::Processing => "processing",
            OrderStatus::Fulfilled => "fulfilled",
            OrderStatus::MintFailed => "mint_failed",
            OrderStatus::OwnershipMintFailed => "ownership_mint_failed",
            OrderStatus::LinkFailed => "link_failed",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for OrderStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(OrderStatus::Created),
            "processing" => Ok(OrderStatus::Processing),
            "fulfilled" => Ok(OrderStatus::Fulfilled),
            "mint_failed" => Ok(OrderStatus::MintFailed),
            "ownership_mint_failed" => Ok(OrderStatus::OwnershipMintFailed),
            "link_failed" => Ok(OrderStatus::LinkFailed),
            _ => Err(crate::Error::UnknownOrderStatus(s.to_string())),
        }
    }
}

/// One purchased artwork unit
///
/// Created by the checkout flow; the saga mutates it only through validated
/// status transitions. Orders are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order id
    pub id: Uuid,
    /// Idempotency key correlating the order with its payment
    pub reference: String,
    /// Buyer id
    pub buyer_id: Uuid,
    /// Artwork id
    pub artwork_id: Uuid,
    /// Price in minor units of [`Order::currency`]
    pub price_cents: u64,
    /// Currency of the price
    pub currency: Currency,
    /// Payment status
    pub payment_status: PaymentStatus,
    /// Fulfillment status
    pub status: OrderStatus,
    /// Unix time the order was created
    pub created_time: u64,
    /// Unix time of the last status change
    pub updated_time: u64,
}

impl Order {
    /// Create a new [`Order`] in the `created` state
    pub fn new(
        reference: String,
        buyer_id: Uuid,
        artwork_id: Uuid,
        price_cents: u64,
        currency: Currency,
    ) -> Self {
        let now = unix_time();
        Self {
            id: Uuid::new_v4(),
            reference,
            buyer_id,
            artwork_id,
            price_cents,
            currency,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Created,
            created_time: now,
            updated_time: now,
        }
    }
}

/// Artwork metadata carried on a mint job
///
/// This is the document pinned for the authenticity token. It is rebuilt
/// from current order and artwork data on an operator retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkMetadata {
    /// Artwork title
    pub name: String,
    /// Artwork description
    pub description: String,
    /// Media reference (image URL)
    pub image: String,
    /// Buyer email
    pub buyer_email: String,
    /// Buyer display name
    pub buyer_name: String,
    /// Sale price in cents
    pub price_cents: u64,
    /// Sale currency
    pub currency: Currency,
    /// Artwork kind, e.g. `digital` or `physical`
    #[serde(rename = "type")]
    pub kind: String,
}
