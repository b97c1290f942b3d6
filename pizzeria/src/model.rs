use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type AccountId = i64;
pub type OrderId = i64;

/// Pizza customizations as a fixed-shape record.
///
/// `veggies` and `meats` are sets for equality purposes: their order carries
/// no meaning, which [`Customizations::canonical`] accounts for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Customizations {
    pub base: String,
    pub sauce: String,
    pub cheese: String,
    #[serde(default)]
    pub veggies: Vec<String>,
    #[serde(default)]
    pub meats: Vec<String>,
}

impl Customizations {
    /// Canonical serialization: field order fixed, set-valued fields sorted.
    fn canonical(&self) -> String {
        let mut veggies = self.veggies.clone();
        veggies.sort();
        let mut meats = self.meats.clone();
        meats.sort();
        format!(
            "base={};sauce={};cheese={};veggies={};meats={}",
            self.base,
            self.sauce,
            self.cheese,
            veggies.join(","),
            meats.join(",")
        )
    }
}

/// A single cart line. Has no durable identity of its own; equivalence for
/// merge/dedup purposes is the [`CartItem::fingerprint`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customizations: Option<Customizations>,
}

impl CartItem {
    /// Derived dedup key: item name plus the canonical customization form.
    /// Quantity and price are deliberately excluded.
    pub fn fingerprint(&self) -> String {
        match &self.customizations {
            Some(c) => format!("{}|{}", self.name, c.canonical()),
            None => format!("{}|", self.name),
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// An ordered sequence of cart items. Order is display-relevant only;
/// merge and totals do not depend on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn add_item(&mut self, item: CartItem) {
        self.items.push(item);
    }

    pub fn remove_item(&mut self, fingerprint: &str) {
        self.items.retain(|i| i.fingerprint() != fingerprint);
    }

    /// Set the quantity of the item with the given fingerprint.
    /// Quantity zero removes the item entirely, never leaves a zero line.
    pub fn update_quantity(&mut self, fingerprint: &str, quantity: u32) {
        if quantity == 0 {
            self.remove_item(fingerprint);
            return;
        }
        for item in &mut self.items {
            if item.fingerprint() == fingerprint {
                item.quantity = quantity;
            }
        }
    }

    /// Sum of `price * quantity` over all items.
    pub fn total(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{10}$").unwrap());
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap());
static PINCODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{6}$").unwrap());

/// A single failed customer-details field, reported back per-field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub pincode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
}

impl CustomerDetails {
    /// Validate every required field, collecting all failures rather than
    /// stopping at the first. The promo code is optional and unconstrained.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "Name is required"));
        }
        if !PHONE_RE.is_match(&self.phone) {
            errors.push(FieldError::new(
                "phone",
                "Please enter a valid 10-digit phone number",
            ));
        }
        if !EMAIL_RE.is_match(&self.email) {
            errors.push(FieldError::new(
                "email",
                "Please enter a valid email address",
            ));
        }
        if self.address.trim().is_empty() {
            errors.push(FieldError::new("address", "Address is required"));
        }
        if !PINCODE_RE.is_match(&self.pincode) {
            errors.push(FieldError::new(
                "pincode",
                "Please enter a valid 6-digit pincode",
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Position of an order in the fixed delivery pipeline.
///
/// The wire strings are bit-exact: `"Received"`, `"In Kitchen"`,
/// `"Sent to Delivery"`, `"Delivered"`. Anything else deserializes into
/// `Unknown` so the tracker stays forward-compatible with pipeline changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    Received,
    InKitchen,
    SentToDelivery,
    Delivered,
    Unknown(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Received => "Received",
            OrderStatus::InKitchen => "In Kitchen",
            OrderStatus::SentToDelivery => "Sent to Delivery",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Unknown(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Received" => OrderStatus::Received,
            "In Kitchen" => OrderStatus::InKitchen,
            "Sent to Delivery" => OrderStatus::SentToDelivery,
            "Delivered" => OrderStatus::Delivered,
            other => OrderStatus::Unknown(other.to_string()),
        }
    }
}

impl Serialize for OrderStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(OrderStatus::parse(&s))
    }
}

/// An immutable checkout-time snapshot. Items are copied from the cart at
/// creation; later cart mutations never affect a created order. Only the
/// status field changes afterwards, driven by the fulfillment process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub items: Vec<CartItem>,
    pub total: Decimal,
    pub status: OrderStatus,
    pub customer_details: CustomerDetails,
    pub created_at: DateTime<Utc>,
}
