//! Step and document-key vocabulary shared across TradeDoc services
//!
//! The visible workflow has four steps. Steps 1-3 each map to exactly one
//! document; step 4 fans out to one of two shipping documents depending on
//! the active variant, so a step number alone is not a storage key.

use serde::{Deserialize, Serialize};

/// Number of visible workflow steps
pub const STEP_COUNT: u8 = 4;

/// One position in the visible multi-document workflow (1..=4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Step(u8);

impl Step {
    /// Validated constructor; `None` outside 1..=STEP_COUNT
    pub fn new(n: u8) -> Option<Self> {
        (1..=STEP_COUNT).contains(&n).then_some(Self(n))
    }

    /// Step number (1-based)
    pub fn number(self) -> u8 {
        self.0
    }

    /// Zero-based index for fixed-size per-step storage
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// All steps in visual order
    pub fn all() -> impl Iterator<Item = Step> {
        (1..=STEP_COUNT).map(Step)
    }
}

impl TryFrom<u8> for Step {
    type Error = String;

    fn try_from(n: u8) -> std::result::Result<Self, Self::Error> {
        Step::new(n).ok_or_else(|| format!("step out of range 1..={}: {}", STEP_COUNT, n))
    }
}

impl From<Step> for u8 {
    fn from(step: Step) -> u8 {
        step.0
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the user chose to produce a step's document
///
/// `Unset` is the initial value; it is distinct from having no entry at all
/// (every tracked step always has a mode).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMode {
    Manual,
    Upload,
    Skip,
    #[default]
    Unset,
}

/// Which concrete shipping document occupies step 4
///
/// `Undecided` routes step 4 to the selection dashboard instead of an editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingDocVariant {
    #[serde(rename = "ci")]
    CommercialInvoice,
    #[serde(rename = "pl")]
    PackingList,
    #[default]
    #[serde(rename = "none")]
    Undecided,
}

/// Concrete storage key for a document's content (1..=5)
///
/// Distinct from [`Step`] because step 4 resolves to different keys
/// depending on the active [`ShippingDocVariant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum DocKey {
    Offer = 1,
    ProformaInvoice = 2,
    SalesContract = 3,
    CommercialInvoice = 4,
    PackingList = 5,
}

impl DocKey {
    /// Storage key number (1..=5)
    pub fn number(self) -> u8 {
        self as u8
    }

    /// The visible step this key belongs to (keys 4 and 5 share step 4)
    pub fn step(self) -> Step {
        match self {
            DocKey::Offer => Step(1),
            DocKey::ProformaInvoice => Step(2),
            DocKey::SalesContract => Step(3),
            DocKey::CommercialInvoice | DocKey::PackingList => Step(4),
        }
    }
}

impl TryFrom<u8> for DocKey {
    type Error = String;

    fn try_from(n: u8) -> std::result::Result<Self, Self::Error> {
        match n {
            1 => Ok(DocKey::Offer),
            2 => Ok(DocKey::ProformaInvoice),
            3 => Ok(DocKey::SalesContract),
            4 => Ok(DocKey::CommercialInvoice),
            5 => Ok(DocKey::PackingList),
            other => Err(format!("document key out of range 1..=5: {}", other)),
        }
    }
}

impl From<DocKey> for u8 {
    fn from(key: DocKey) -> u8 {
        key as u8
    }
}

impl std::fmt::Display for DocKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Resolve a visible step plus the active shipping variant to the concrete
/// document key used to store and retrieve that step's content.
///
/// Pure and referentially stable; callers may memoize. `None` means "no
/// concrete document yet" (step 4 with the variant undecided) and must route
/// to the selection dashboard rather than an editor.
pub fn resolve_doc_key(step: Step, variant: ShippingDocVariant) -> Option<DocKey> {
    match (step.number(), variant) {
        (1, _) => Some(DocKey::Offer),
        (2, _) => Some(DocKey::ProformaInvoice),
        (3, _) => Some(DocKey::SalesContract),
        (4, ShippingDocVariant::CommercialInvoice) => Some(DocKey::CommercialInvoice),
        (4, ShippingDocVariant::PackingList) => Some(DocKey::PackingList),
        (4, ShippingDocVariant::Undecided) => None,
        _ => None,
    }
}
