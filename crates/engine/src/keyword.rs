use regex::Regex;

use leadly_core::{Classification, ClassificationSource, IntentType};

/// Unambiguous confirmations. A match is strong enough to skip the AI
/// path entirely.
pub const PRIMARY_CONFIRMATIONS: &[&str] = &[
    "lock it in",
    "let's lock it in",
    "lock us in",
    "yes lock it in",
    "we're in",
    "count us in",
    "let's do it",
    "lets do it",
    "we accept",
    "ready to move forward",
    "ready to proceed",
    "move forward with the contract",
];

/// Confirmations that usually mean purchase intent but warrant AI review.
pub const MEDIUM_CONFIRMATIONS: &[&str] = &[
    "send the invoice",
    "send over the invoice",
    "send the contract",
    "sign us up",
    "where do i sign",
    "sounds good, let's proceed",
    "we'd like to proceed",
    "go ahead",
    "happy to proceed",
];

/// Closures that signal the lead is lost.
pub const NEGATIVE_CLOSURES: &[&str] = &[
    "not interested",
    "no longer interested",
    "we'll pass",
    "we will pass",
    "going with another",
    "chose another",
    "please remove",
    "unsubscribe",
    "no thank",
    "not at this time",
];

const SIMPLE_YES_PATTERNS: &[&str] = &[
    r"^yes[.!]?$",
    r"^yes\s+(?:please|sir|ma'am)[.!]?$",
    r"^yep[.!]?$",
    r"^yeah[.!]?$",
    r"^absolutely[.!]?$",
    r"^definitely[.!]?$",
];

const PRIMARY_CONFIDENCE: f32 = 0.95;
const MEDIUM_CONFIDENCE: f32 = 0.8;
const SIMPLE_YES_CONFIDENCE: f32 = 0.85;
const NEGATIVE_CONFIDENCE: f32 = 0.9;
const DEFAULT_CONFIDENCE: f32 = 0.1;

/// Confidence at or above which a purchase-intent keyword result is
/// accepted without consulting the AI orchestrator.
pub const SHORT_CIRCUIT_CONFIDENCE: f32 = 0.9;

/// Deterministic, local purchase-intent detector.
///
/// Runs before any provider call; its result either short-circuits the AI
/// path or serves as the fail-open fallback when the AI path is down.
pub struct KeywordClassifier {
    simple_yes: Vec<Regex>,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        let simple_yes = SIMPLE_YES_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern).expect("static pattern compiles"))
            .collect();
        Self { simple_yes }
    }

    /// Classify already-quote-stripped reply text.
    pub fn classify(&self, text: &str) -> Classification {
        let normalized = normalize_for_matching(text);

        if let Some(phrase) = first_substring_match(&normalized, PRIMARY_CONFIRMATIONS) {
            return keyword_result(
                true,
                IntentType::ReadyToPurchase,
                PRIMARY_CONFIDENCE,
                vec![phrase],
            );
        }

        if let Some(phrase) = first_substring_match(&normalized, MEDIUM_CONFIRMATIONS) {
            return keyword_result(
                true,
                IntentType::ReadyToPurchase,
                MEDIUM_CONFIDENCE,
                vec![phrase],
            );
        }

        let trimmed = text.trim().to_lowercase();
        if self.simple_yes.iter().any(|pattern| pattern.is_match(&trimmed)) {
            return keyword_result(
                true,
                IntentType::ReadyToPurchase,
                SIMPLE_YES_CONFIDENCE,
                vec![trimmed],
            );
        }

        if let Some(phrase) = first_substring_match(&normalized, NEGATIVE_CLOSURES) {
            return keyword_result(
                false,
                IntentType::NotInterested,
                NEGATIVE_CONFIDENCE,
                vec![phrase],
            );
        }

        keyword_result(false, IntentType::Inquiry, DEFAULT_CONFIDENCE, Vec::new())
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a keyword result is decisive enough to skip the AI path.
pub fn short_circuits(classification: &Classification) -> bool {
    classification.purchase_intent && classification.confidence >= SHORT_CIRCUIT_CONFIDENCE
}

fn keyword_result(
    purchase_intent: bool,
    intent_type: IntentType,
    confidence: f32,
    detected_phrases: Vec<String>,
) -> Classification {
    let primary_concern = match intent_type {
        IntentType::ReadyToPurchase => "Confirmation detected in reply".to_string(),
        IntentType::NotInterested => "Lead declined in reply".to_string(),
        _ => "No decisive phrase detected".to_string(),
    };

    Classification {
        purchase_intent,
        intent_type,
        primary_concern,
        suggested_response: String::new(),
        confidence,
        detected_phrases,
        source: ClassificationSource::Keyword,
        provider_used: None,
        attempts: Vec::new(),
    }
}

/// Lowercase and strip punctuation so substring matching is insensitive to
/// casing and stray characters. Apostrophes survive because several
/// canonical phrases carry them.
fn normalize_for_matching(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for character in text.chars() {
        if character.is_alphanumeric() || character == '\'' {
            normalized.extend(character.to_lowercase());
        } else {
            normalized.push(' ');
        }
    }
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_substring_match(normalized: &str, phrases: &[&str]) -> Option<String> {
    phrases
        .iter()
        .find(|phrase| normalized.contains(&normalize_for_matching(phrase)))
        .map(|phrase| (*phrase).to_string())
}

#[cfg(test)]
mod tests {
    use leadly_core::{ClassificationSource, IntentType};

    use super::{short_circuits, KeywordClassifier};

    #[test]
    fn primary_phrase_matches_any_casing_and_punctuation() {
        let classifier = KeywordClassifier::new();
        for text in ["Lock it in!", "LOCK IT IN", "Please... lock, it, in."] {
            let result = classifier.classify(text);
            assert!(result.purchase_intent, "expected purchase intent for {text:?}");
            assert_eq!(result.intent_type, IntentType::ReadyToPurchase);
            assert_eq!(result.confidence, 0.95);
            assert!(short_circuits(&result));
        }
    }

    #[test]
    fn medium_phrase_is_provisional() {
        let classifier = KeywordClassifier::new();
        let result = classifier.classify("Great, send the invoice when you can");
        assert!(result.purchase_intent);
        assert_eq!(result.confidence, 0.8);
        assert!(!short_circuits(&result));
    }

    #[test]
    fn bare_yes_fires_simple_pattern() {
        let classifier = KeywordClassifier::new();
        let result = classifier.classify("Yes.");
        assert!(result.purchase_intent);
        assert_eq!(result.intent_type, IntentType::ReadyToPurchase);
        assert_eq!(result.confidence, 0.85);
    }

    #[test]
    fn yes_buried_in_longer_text_does_not_fire() {
        let classifier = KeywordClassifier::new();
        let result = classifier.classify("Yes, but I still have questions about pricing");
        assert!(!result.purchase_intent);
        assert_eq!(result.intent_type, IntentType::Inquiry);
    }

    #[test]
    fn negative_closure_is_not_interested_without_short_circuit() {
        let classifier = KeywordClassifier::new();
        let result = classifier.classify("We are not interested at this time, thank you");
        assert!(!result.purchase_intent);
        assert_eq!(result.intent_type, IntentType::NotInterested);
        assert_eq!(result.confidence, 0.9);
        assert!(!short_circuits(&result));
    }

    #[test]
    fn unmatched_text_defaults_to_low_confidence_inquiry() {
        let classifier = KeywordClassifier::new();
        let result = classifier.classify("Could you tell me more about the program schedule?");
        assert!(!result.purchase_intent);
        assert_eq!(result.intent_type, IntentType::Inquiry);
        assert_eq!(result.confidence, 0.1);
        assert!(result.detected_phrases.is_empty());
    }

    #[test]
    fn keyword_results_carry_keyword_source_and_matched_phrase() {
        let classifier = KeywordClassifier::new();
        let result = classifier.classify("count us in");
        assert_eq!(result.source, ClassificationSource::Keyword);
        assert_eq!(result.detected_phrases, vec!["count us in".to_string()]);
    }

    #[test]
    fn handles_common_reply_phrasings() {
        struct Case {
            text: &'static str,
            expect_purchase: bool,
        }

        let cases = vec![
            Case { text: "We're in, let's get started", expect_purchase: true },
            Case { text: "Sign us up for the spring cohort", expect_purchase: true },
            Case { text: "yep", expect_purchase: true },
            Case { text: "Where do I sign?", expect_purchase: true },
            Case { text: "Happy to proceed on our side", expect_purchase: true },
            Case { text: "unsubscribe", expect_purchase: false },
            Case { text: "We chose another vendor, sorry", expect_purchase: false },
            Case { text: "What does onboarding look like?", expect_purchase: false },
            Case { text: "Can we talk pricing first?", expect_purchase: false },
        ];

        let classifier = KeywordClassifier::new();
        for (index, case) in cases.iter().enumerate() {
            let result = classifier.classify(case.text);
            assert_eq!(
                result.purchase_intent, case.expect_purchase,
                "case {index} mismatched: {}",
                case.text
            );
            assert!(result.invariant_holds(), "case {index} broke invariant: {}", case.text);
        }
    }
}
