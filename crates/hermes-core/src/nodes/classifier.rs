//! Classifier node: segments the email, labels intent, extracts product
//! mentions (spec §4.5).

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::domain::{CustomerEmail, EmailAnalysis, ProductMention, Segment};
use crate::error::ToolCallError;
use crate::llm::retry::{generate_structured, RetryLoopConfig};
use crate::llm::LlmProvider;

/// Words stripped from a mention's `product_name` when they trail the
/// branded name and duplicate `product_type` (spec §4.5: "`Alpine Explorer
/// backpack` → name=`Alpine Explorer`, type=`backpack`").
const GENERIC_CATEGORY_WORDS: &[&str] = &[
    "backpack", "bag", "wallet", "shirt", "jacket", "coat", "shoes", "boots", "sneakers", "sweater",
    "dress", "skirt", "pants", "jeans", "scarf", "hat", "gloves", "belt", "purse", "tote",
];

fn product_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{3}[0-9]{4}$").expect("product id regex must compile"))
}

fn system_prompt() -> &'static str {
    "You are the classifier stage of a customer-service email pipeline for a fashion retailer. \
     Segment the email into order, inquiry, or personal-statement spans, detect the language, \
     extract structured customer PII, and list every product mention with as much of \
     {product_id, product_name, product_description, product_category, product_type, quantity, \
     confidence} as you can infer. Respond with JSON matching the requested schema only."
}

#[derive(Debug, Deserialize)]
struct ClassifierResponse {
    language: String,
    #[serde(default)]
    customer_pii: std::collections::HashMap<String, String>,
    segments: Vec<Segment>,
}

/// Run the Classifier against one email.
pub async fn run(
    email: &CustomerEmail,
    provider: &dyn LlmProvider,
    retry_config: &RetryLoopConfig,
) -> Result<EmailAnalysis, ToolCallError> {
    let prompt = format!(
        "Email id: {}\nSubject: {}\nMessage:\n{}",
        email.email_id,
        email.subject.as_deref().unwrap_or("(none)"),
        email.message
    );

    let parsed: ClassifierResponse =
        generate_structured(provider, system_prompt(), &prompt, None, &[], retry_config).await?;

    let mut segments = parsed.segments;
    for segment in &mut segments {
        for mention in &mut segment.mentions {
            normalize_mention(mention);
        }
    }
    consolidate_across_segments(&mut segments);

    Ok(EmailAnalysis::new(
        email.email_id.clone(),
        parsed.language,
        parsed.customer_pii,
        segments,
    ))
}

/// Apply the id-regex confidence rule and strip generic category words from
/// `product_name` into `product_type` (spec §4.5).
fn normalize_mention(mention: &mut ProductMention) {
    if let Some(raw_id) = &mention.product_id {
        let normalized = crate::domain::normalize_id(raw_id);
        let matches_shape = product_id_pattern().is_match(&normalized);
        mention.product_id = Some(normalized);
        if matches_shape {
            mention.confidence = mention.confidence.max(1.0);
        } else {
            mention.confidence = mention.confidence.min(0.6);
        }
    }

    if let Some(name) = mention.product_name.clone() {
        let lower = name.to_lowercase();
        for word in GENERIC_CATEGORY_WORDS {
            if let Some(stripped) = lower.strip_suffix(word) {
                let stripped = stripped.trim_end();
                if !stripped.is_empty() {
                    let branded_len = stripped.len();
                    mention.product_name = Some(name[..branded_len].trim_end().to_string());
                    if mention.product_type.is_none() {
                        mention.product_type = Some((*word).to_string());
                    }
                    break;
                }
            }
        }
    }
}

/// Merge mentions of the same referent across segments (spec §4.5): two
/// mentions are the same referent if they share a normalized `product_id`,
/// or (absent any id) the same lower-cased `product_name`.
fn consolidate_across_segments(segments: &mut [Segment]) {
    let mut seen_ids: std::collections::HashMap<String, (usize, usize)> = std::collections::HashMap::new();
    let mut seen_names: std::collections::HashMap<String, (usize, usize)> = std::collections::HashMap::new();
    let mut to_remove: Vec<(usize, usize)> = Vec::new();

    for seg_idx in 0..segments.len() {
        for mention_idx in 0..segments[seg_idx].mentions.len() {
            let id_key = segments[seg_idx].mentions[mention_idx].product_id.clone();
            let name_key = segments[seg_idx].mentions[mention_idx]
                .product_name
                .as_ref()
                .map(|n| n.to_lowercase());

            let existing = id_key
                .as_ref()
                .and_then(|k| seen_ids.get(k).copied())
                .or_else(|| name_key.as_ref().and_then(|k| seen_names.get(k).copied()));

            match existing {
                Some((prev_seg, prev_idx)) => {
                    let other = segments[seg_idx].mentions[mention_idx].clone();
                    segments[prev_seg].mentions[prev_idx].consolidate(&other);
                    to_remove.push((seg_idx, mention_idx));
                }
                None => {
                    if let Some(k) = id_key {
                        seen_ids.insert(k, (seg_idx, mention_idx));
                    }
                    if let Some(k) = name_key {
                        seen_names.insert(k, (seg_idx, mention_idx));
                    }
                }
            }
        }
    }

    for (seg_idx, mention_idx) in to_remove.into_iter().rev() {
        segments[seg_idx].mentions.remove(mention_idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SegmentKind;

    fn mention(id: Option<&str>, name: Option<&str>, qty: u32) -> ProductMention {
        ProductMention {
            product_id: id.map(str::to_string),
            product_name: name.map(str::to_string),
            quantity: qty,
            ..Default::default()
        }
    }

    #[test]
    fn normalize_mention_marks_full_confidence_for_valid_shape() {
        let mut m = mention(Some("CBT8901"), None, 1);
        normalize_mention(&mut m);
        assert_eq!(m.confidence, 1.0);
    }

    #[test]
    fn normalize_mention_lowers_confidence_for_malformed_id() {
        let mut m = mention(Some("DHN0987X"), None, 1);
        normalize_mention(&mut m);
        assert!(m.confidence <= 0.6);
    }

    #[test]
    fn normalize_mention_strips_generic_category_word() {
        let mut m = mention(None, Some("Alpine Explorer backpack"), 1);
        normalize_mention(&mut m);
        assert_eq!(m.product_name.as_deref(), Some("Alpine Explorer"));
        assert_eq!(m.product_type.as_deref(), Some("backpack"));
    }

    #[test]
    fn consolidate_merges_same_id_across_segments() {
        let mut segments = vec![
            Segment {
                kind: SegmentKind::Order,
                main_sentence: "I'd like two wallets".into(),
                related_sentences: vec![],
                mentions: vec![mention(Some("LTH0976"), None, 1)],
            },
            Segment {
                kind: SegmentKind::Order,
                main_sentence: "actually make it one more".into(),
                related_sentences: vec![],
                mentions: vec![mention(Some("LTH0976"), None, 1)],
            },
        ];
        consolidate_across_segments(&mut segments);
        assert_eq!(segments[0].mentions.len(), 1);
        assert_eq!(segments[1].mentions.len(), 0);
        assert_eq!(segments[0].mentions[0].quantity, 2);
    }

    #[test]
    fn consolidate_leaves_distinct_mentions_untouched() {
        let mut segments = vec![Segment {
            kind: SegmentKind::Order,
            main_sentence: "x".into(),
            related_sentences: vec![],
            mentions: vec![mention(Some("LTH0976"), None, 1), mention(Some("CBT8901"), None, 1)],
        }];
        consolidate_across_segments(&mut segments);
        assert_eq!(segments[0].mentions.len(), 2);
    }
}
