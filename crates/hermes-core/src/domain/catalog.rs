//! Product catalog, stock ledger, and promotion spec types (spec §3, §5).
//!
//! The catalog is loaded once per process from CSV (spec §6 "Catalog CSV
//! schema") and is read-only thereafter except for `stock`, which is
//! mutated by the Fulfiller under a single-writer-per-product discipline
//! (spec §5 "Shared resources"). Each entry's mutable stock lives behind
//! its own `Mutex`, mirroring the spec's "mutex per product id" option.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// One of the four seasons, or all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
    AllSeasons,
}

impl Season {
    /// Parse a single season token from the catalog CSV's comma-separated field.
    pub fn parse(token: &str) -> Option<Season> {
        match token.trim().to_lowercase().as_str() {
            "spring" => Some(Season::Spring),
            "summer" => Some(Season::Summer),
            "fall" | "autumn" => Some(Season::Fall),
            "winter" => Some(Season::Winter),
            "all seasons" | "all_seasons" | "allseasons" => Some(Season::AllSeasons),
            _ => None,
        }
    }
}

/// Closed enum of retailer categories (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Accessories,
    Bags,
    #[serde(rename = "Men's Clothing")]
    MensClothing,
    #[serde(rename = "Men's Shoes")]
    MensShoes,
    #[serde(rename = "Women's Clothing")]
    WomensClothing,
    #[serde(rename = "Women's Shoes")]
    WomensShoes,
    Loungewear,
    #[serde(rename = "Kid's Clothing")]
    KidsClothing,
    Shirts,
}

impl Category {
    /// Repair smart-quote variants of `Kid's Clothing` (spec §9 Open
    /// Questions: "Preserve this behavior verbatim unless a reason to
    /// generalize is supplied" — no other category gets this treatment).
    pub fn normalize_raw(raw: &str) -> String {
        let repaired = raw.replace(['\u{2018}', '\u{2019}'], "'");
        if repaired.eq_ignore_ascii_case("kids clothing") || repaired.eq_ignore_ascii_case("kid's clothing") {
            "Kid's Clothing".to_string()
        } else {
            repaired
        }
    }

    /// Parse a category from its display string, applying smart-quote repair first.
    pub fn parse(raw: &str) -> Option<Category> {
        let normalized = Self::normalize_raw(raw);
        match normalized.as_str() {
            "Accessories" => Some(Category::Accessories),
            "Bags" => Some(Category::Bags),
            "Men's Clothing" => Some(Category::MensClothing),
            "Men's Shoes" => Some(Category::MensShoes),
            "Women's Clothing" => Some(Category::WomensClothing),
            "Women's Shoes" => Some(Category::WomensShoes),
            "Loungewear" => Some(Category::Loungewear),
            "Kid's Clothing" => Some(Category::KidsClothing),
            "Shirts" => Some(Category::Shirts),
            _ => None,
        }
    }

    /// Display string matching the catalog CSV's category column values.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Accessories => "Accessories",
            Category::Bags => "Bags",
            Category::MensClothing => "Men's Clothing",
            Category::MensShoes => "Men's Shoes",
            Category::WomensClothing => "Women's Clothing",
            Category::WomensShoes => "Women's Shoes",
            Category::Loungewear => "Loungewear",
            Category::KidsClothing => "Kid's Clothing",
            Category::Shirts => "Shirts",
        }
    }
}

/// Discriminant for [`DiscountSpec`]'s pricing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Percentage,
    Fixed,
    BogoHalf,
}

/// A single discount rule within a [`PromotionEffects`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountSpec {
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    /// Percentage points (0-100) for `Percentage`, currency amount for
    /// `Fixed`, or discount percentage for `BogoHalf` (always 50 per spec).
    pub amount: f64,
    /// The line this discount applies to; `None` means "all eligible lines".
    #[serde(default)]
    pub to_product_id: Option<String>,
}

/// Gating conditions for a [`PromotionSpec`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromotionConditions {
    /// Minimum quantity of the target product(s) required.
    #[serde(default)]
    pub min_quantity: Option<u32>,
    /// Reserved for future "applies every N units" semantics; carried
    /// through but not interpreted by the core discount math (spec names
    /// it without fully specifying behavior).
    #[serde(default)]
    pub applies_every: Option<u32>,
    /// When set, this is a combination promotion (spec §4.3 Phase A):
    /// all of these product ids must be present in the order.
    #[serde(default)]
    pub product_combination: Option<Vec<String>>,
}

/// Effects applied when a [`PromotionSpec`]'s conditions are satisfied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromotionEffects {
    #[serde(default)]
    pub apply_discount: Option<DiscountSpec>,
    #[serde(default)]
    pub free_items: Option<u32>,
    #[serde(default)]
    pub free_gift: Option<String>,
}

/// A declarative discount or gift rule (spec §3, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionSpec {
    pub conditions: PromotionConditions,
    pub effects: PromotionEffects,
}

impl PromotionSpec {
    /// True when this is a Phase A combination promotion.
    pub fn is_combination(&self) -> bool {
        self.conditions
            .product_combination
            .as_ref()
            .is_some_and(|ids| !ids.is_empty())
    }
}

/// Load the active promotion specs from the file named by the
/// `promotion_specs` config key (spec §6). YAML by extension (`.yml`,
/// `.yaml`), JSON otherwise.
pub fn load_promotion_specs(path: &std::path::Path) -> Result<Vec<PromotionSpec>, crate::error::IoError> {
    let contents = std::fs::read_to_string(path).map_err(|source| crate::error::IoError::Path {
        path: path.display().to_string(),
        source,
    })?;

    let is_yaml = matches!(path.extension().and_then(|e| e.to_str()), Some("yml") | Some("yaml"));
    if is_yaml {
        Ok(serde_yaml::from_str(&contents)?)
    } else {
        Ok(serde_json::from_str(&contents).map_err(|e| crate::error::IoError::Path {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
        })?)
    }
}

/// A catalog product. Immutable except for `stock`, which is a snapshot
/// value here — the authoritative mutable count lives in [`Catalog`]'s
/// internal ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub product_type: String,
    pub stock: u32,
    pub seasons: HashSet<Season>,
    pub price: f64,
    pub promotion: Option<PromotionSpec>,
    pub promotion_text: Option<String>,
    pub metadata: Option<String>,
}

struct CatalogEntry {
    product: Product,
    stock: Mutex<u32>,
}

/// Normalize a product id the way mention resolution does (spec §4.4 step 1):
/// strip whitespace and bracket characters, then upper-case.
///
/// Idempotent: `normalize_id(normalize_id(x)) == normalize_id(x)` (spec §8).
pub fn normalize_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '[' | ']' | '(' | ')' | '{' | '}'))
        .collect::<String>()
        .to_uppercase()
}

/// Process-lifetime product catalog with a mutable, single-writer-per-product
/// stock ledger (spec §5).
pub struct Catalog {
    entries: HashMap<String, CatalogEntry>,
    /// Insertion order, for deterministic iteration in resolver fallback scans.
    order: Vec<String>,
}

impl Catalog {
    /// Build a catalog from already-parsed products, keyed by normalized id.
    pub fn from_products(products: Vec<Product>) -> Result<Self, CatalogError> {
        let mut entries = HashMap::with_capacity(products.len());
        let mut order = Vec::with_capacity(products.len());
        for product in products {
            let key = normalize_id(&product.product_id);
            if entries.contains_key(&key) {
                return Err(CatalogError::DuplicateProductId {
                    product_id: product.product_id,
                });
            }
            order.push(key.clone());
            let stock = Mutex::new(product.stock);
            entries.insert(key, CatalogEntry { product, stock });
        }
        Ok(Self { entries, order })
    }

    /// Load a catalog from the CSV layout in spec §6: `product_id, name,
    /// category, description, stock, price, season, type`.
    pub fn load_csv(path: &std::path::Path) -> Result<Self, CatalogError> {
        let mut reader = csv::Reader::from_path(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, source.to_string()),
        })?;

        let headers = reader.headers().map_err(|e| CatalogError::MalformedRow {
            row: 0,
            message: e.to_string(),
        })?;
        for required in ["product_id", "name", "category", "description", "stock", "price", "season", "type"] {
            if !headers.iter().any(|h| h == required) {
                return Err(CatalogError::MissingColumn {
                    column: required.to_string(),
                });
            }
        }

        let mut products = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.map_err(|e| CatalogError::MalformedRow {
                row: idx + 1,
                message: e.to_string(),
            })?;
            let row: CsvRow = record.deserialize(Some(headers)).map_err(|e| CatalogError::MalformedRow {
                row: idx + 1,
                message: e.to_string(),
            })?;
            let category = Category::parse(&row.category).ok_or_else(|| CatalogError::MalformedRow {
                row: idx + 1,
                message: format!("unknown category '{}'", row.category),
            })?;
            let seasons = row
                .season
                .split(',')
                .filter_map(Season::parse)
                .collect::<HashSet<_>>();
            products.push(Product {
                product_id: row.product_id,
                name: row.name,
                description: row.description,
                category,
                product_type: row.r#type,
                stock: row.stock,
                seasons,
                price: row.price,
                promotion: None,
                promotion_text: None,
                metadata: None,
            });
        }
        Self::from_products(products)
    }

    /// All products, in catalog load order, with a live stock snapshot.
    pub fn all(&self) -> Vec<Product> {
        self.order
            .iter()
            .map(|key| self.snapshot(&self.entries[key]))
            .collect()
    }

    /// Look up a product by normalized id, returning a stock-consistent snapshot.
    pub fn get(&self, product_id: &str) -> Option<Product> {
        self.entries.get(&normalize_id(product_id)).map(|e| self.snapshot(e))
    }

    /// True iff a product with this (normalized) id exists.
    pub fn contains(&self, product_id: &str) -> bool {
        self.entries.contains_key(&normalize_id(product_id))
    }

    fn snapshot(&self, entry: &CatalogEntry) -> Product {
        let mut product = entry.product.clone();
        product.stock = *entry.stock.lock().expect("stock mutex poisoned");
        product
    }

    /// Attempt to reserve `quantity` units of `product_id`, atomically.
    ///
    /// Returns `Some(stock_after)` on success (sufficient stock, decremented),
    /// or `None` if stock was insufficient (no mutation performed) or the
    /// product is unknown.
    pub fn reserve(&self, product_id: &str, quantity: u32) -> Option<u32> {
        let entry = self.entries.get(&normalize_id(product_id))?;
        let mut stock = entry.stock.lock().expect("stock mutex poisoned");
        if *stock >= quantity {
            *stock -= quantity;
            Some(*stock)
        } else {
            None
        }
    }

    /// Current stock for a product, without mutation.
    pub fn current_stock(&self, product_id: &str) -> Option<u32> {
        self.entries
            .get(&normalize_id(product_id))
            .map(|e| *e.stock.lock().expect("stock mutex poisoned"))
    }

    /// Up to `n` same-category, in-stock alternatives for `product_id`,
    /// ranked by ascending absolute price delta (spec §4.3 step 2,
    /// grounded in the original's "complementary_category_match" /
    /// "price_similarity_match" resolution methods — see SPEC_FULL.md).
    pub fn alternatives(&self, product_id: &str, n: usize) -> Vec<Product> {
        let Some(target) = self.get(product_id) else {
            return Vec::new();
        };
        let mut candidates: Vec<Product> = self
            .order
            .iter()
            .map(|key| self.snapshot(&self.entries[key]))
            .filter(|p| p.product_id != target.product_id && p.category == target.category && p.stock > 0)
            .collect();
        candidates.sort_by(|a, b| {
            let da = (a.price - target.price).abs();
            let db = (b.price - target.price).abs();
            da.partial_cmp(&db)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        candidates.truncate(n);
        candidates
    }

    /// Number of products in the catalog.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the catalog has no products.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    product_id: String,
    name: String,
    category: String,
    description: String,
    stock: u32,
    price: f64,
    season: String,
    r#type: String,
}
