//! Email, segment, and analysis types produced by the Classifier (spec §3, §4.5).

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IoError;

/// A single customer-service email, immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerEmail {
    /// Opaque identifier supplied by the ingest source.
    pub email_id: String,
    /// Optional subject line.
    pub subject: Option<String>,
    /// Full message body.
    pub message: String,
}

impl CustomerEmail {
    /// Construct a new immutable email record.
    pub fn new(email_id: impl Into<String>, subject: Option<String>, message: impl Into<String>) -> Self {
        Self {
            email_id: email_id.into(),
            subject,
            message: message.into(),
        }
    }

    /// Load a batch of emails from the CSV layout in spec §6: `email_id,
    /// subject, message` (`subject` may be blank).
    pub fn load_csv(path: &Path) -> Result<Vec<CustomerEmail>, IoError> {
        #[derive(Deserialize)]
        struct Row {
            email_id: String,
            #[serde(default)]
            subject: String,
            #[serde(default)]
            message: String,
        }

        let mut reader = csv::Reader::from_path(path)?;
        let mut emails = Vec::new();
        for record in reader.deserialize() {
            let row: Row = record?;
            let subject = if row.subject.trim().is_empty() { None } else { Some(row.subject) };
            emails.push(CustomerEmail::new(row.email_id, subject, row.message));
        }
        Ok(emails)
    }
}

/// Closed intent set (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// The customer wants to place or modify an order.
    OrderRequest,
    /// The customer is asking a factual question about a product.
    ProductInquiry,
}

impl Intent {
    /// Display string matching the classification CSV's category column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::OrderRequest => "order_request",
            Intent::ProductInquiry => "product_inquiry",
        }
    }
}

/// Closed segment-kind set (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// An order-intent segment.
    Order,
    /// A product-inquiry segment.
    Inquiry,
    /// Neither an order nor an inquiry (small talk, gratitude, etc.).
    PersonalStatement,
}

/// A single referent to a product in the email, possibly ambiguous.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductMention {
    /// Catalog product id as written by the customer, if any.
    pub product_id: Option<String>,
    /// The branded product name, generic category words stripped (spec §4.5).
    pub product_name: Option<String>,
    /// Free-text description supplied by the customer.
    pub product_description: Option<String>,
    /// Category, if it can be inferred (closed set, see [`crate::domain::Category`]).
    pub product_category: Option<String>,
    /// Product type (e.g. "backpack") as distinct from the branded name.
    pub product_type: Option<String>,
    /// Requested quantity; defaults to 1.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Extraction confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: f64,
}

fn default_quantity() -> u32 {
    1
}

impl ProductMention {
    /// True when the mention carries no identifying information at all
    /// (spec §8 boundary behavior: such mentions must land in `unresolved`).
    pub fn is_empty_mention(&self) -> bool {
        self.product_id.as_deref().map(str::trim).unwrap_or("").is_empty()
            && self.product_name.as_deref().map(str::trim).unwrap_or("").is_empty()
            && self
                .product_description
                .as_deref()
                .map(str::trim)
                .unwrap_or("")
                .is_empty()
            && self.product_type.as_deref().map(str::trim).unwrap_or("").is_empty()
    }

    /// Merge another mention of the same referent into this one: quantities
    /// are summed and descriptions are concatenated (spec §4.5 consolidation
    /// rule).
    pub fn consolidate(&mut self, other: &ProductMention) {
        self.quantity += other.quantity;
        if self.product_id.is_none() {
            self.product_id = other.product_id.clone();
        }
        if self.product_name.is_none() {
            self.product_name = other.product_name.clone();
        }
        match (&mut self.product_description, &other.product_description) {
            (Some(d), Some(o)) if !d.contains(o.as_str()) => {
                d.push_str("; ");
                d.push_str(o);
            }
            (None, Some(o)) => self.product_description = Some(o.clone()),
            _ => {}
        }
        if self.product_type.is_none() {
            self.product_type = other.product_type.clone();
        }
        if self.product_category.is_none() {
            self.product_category = other.product_category.clone();
        }
        self.confidence = self.confidence.max(other.confidence);
    }
}

/// One coherent span of the email: a leading sentence plus related sentences
/// and the mentions extracted from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Segment {
    /// What kind of segment this is.
    pub kind: SegmentKind,
    /// The sentence that anchors this segment.
    pub main_sentence: String,
    /// Supporting sentences belonging to the same segment.
    #[serde(default)]
    pub related_sentences: Vec<String>,
    /// Product mentions extracted from this segment.
    #[serde(default)]
    pub mentions: Vec<ProductMention>,
}

impl Default for SegmentKind {
    fn default() -> Self {
        SegmentKind::PersonalStatement
    }
}

/// Structured PII normalized out of the open `customer_pii` map (spec §9
/// "Duck-typed PII"): the map stays as the LLM-facing boundary type, but
/// well-known keys are promoted to typed fields immediately after parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedPii {
    /// Customer name, if present under `"name"`.
    pub name: Option<String>,
    /// Customer email address, if present under `"email"`.
    pub email: Option<String>,
    /// Customer phone number, if present under `"phone"`.
    pub phone: Option<String>,
}

impl NormalizedPii {
    /// Promote well-known keys out of an open PII map.
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        Self {
            name: map.get("name").cloned(),
            email: map.get("email").cloned(),
            phone: map.get("phone").cloned(),
        }
    }
}

/// The Classifier's terminal output (spec §3).
///
/// Invariant: `intent == OrderRequest` iff at least one segment has
/// `kind == Order`. Enforced in [`EmailAnalysis::new`]; callers constructing
/// this type by other means (e.g. LLM deserialization) should call
/// [`EmailAnalysis::reconcile_intent`] before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAnalysis {
    /// Echoes the source email's id.
    pub email_id: String,
    /// Detected language (ISO code or English name); not used for routing.
    pub language: String,
    /// The overall intent, reconciled with segment kinds.
    pub intent: Intent,
    /// Open PII map as produced by the LLM.
    #[serde(default)]
    pub customer_pii: HashMap<String, String>,
    /// Typed PII promoted from `customer_pii` (spec §9 supplement).
    #[serde(default)]
    pub pii: NormalizedPii,
    /// The segmented email body.
    pub segments: Vec<Segment>,
}

impl EmailAnalysis {
    /// Construct an analysis, reconciling `intent` against segment kinds.
    pub fn new(
        email_id: impl Into<String>,
        language: impl Into<String>,
        customer_pii: HashMap<String, String>,
        segments: Vec<Segment>,
    ) -> Self {
        let pii = NormalizedPii::from_map(&customer_pii);
        let mut analysis = Self {
            email_id: email_id.into(),
            language: language.into(),
            intent: Intent::ProductInquiry,
            customer_pii,
            pii,
            segments,
        };
        analysis.reconcile_intent();
        analysis
    }

    /// Enforce the spec §3 invariant: `intent == OrderRequest` iff any
    /// segment has `kind == Order`.
    pub fn reconcile_intent(&mut self) {
        self.intent = if self.has_order_segment() {
            Intent::OrderRequest
        } else {
            Intent::ProductInquiry
        };
    }

    /// True if any segment carries order intent.
    pub fn has_order_segment(&self) -> bool {
        self.segments.iter().any(|s| s.kind == SegmentKind::Order)
    }

    /// True if any segment carries inquiry intent.
    pub fn has_inquiry_segment(&self) -> bool {
        self.segments.iter().any(|s| s.kind == SegmentKind::Inquiry)
    }

    /// All product mentions across all segments, in segment order.
    pub fn all_mentions(&self) -> Vec<&ProductMention> {
        self.segments.iter().flat_map(|s| &s.mentions).collect()
    }
}
