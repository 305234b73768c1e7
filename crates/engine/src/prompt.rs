use leadly_core::LeadContext;

use crate::keyword::{MEDIUM_CONFIRMATIONS, NEGATIVE_CLOSURES, PRIMARY_CONFIRMATIONS};

/// Build the classification instruction for a provider call.
///
/// Only the quote-stripped reply text is embedded, never the raw
/// original: quoted history routinely contains our own confirmation
/// phrases and would poison the classification. Deterministic for a
/// given input so provider retries replay the identical prompt.
pub fn build_classification_prompt(
    stripped_reply: &str,
    lead: &LeadContext,
    subject: Option<&str>,
) -> String {
    let mut prompt = String::with_capacity(1_024);

    prompt.push_str(
        "You are classifying a customer's email reply for a lead-management CRM.\n\
         Decide whether the customer intends to purchase.\n\n",
    );

    prompt.push_str("Lead context:\n");
    prompt.push_str(&format!("- Name: {}\n", lead.name));
    prompt.push_str(&format!("- Organization: {}\n", lead.organization));
    prompt.push_str(&format!("- Program: {}\n", lead.program));
    if let Some(subject) = subject {
        prompt.push_str(&format!("- Reply subject: {subject}\n"));
    }

    prompt.push_str("\nReply text (quoted history already removed):\n\"\"\"\n");
    prompt.push_str(stripped_reply);
    prompt.push_str("\n\"\"\"\n\n");

    prompt.push_str(
        "Intent categories: ready_to_purchase, negotiating, inquiry, not_interested.\n",
    );
    prompt.push_str(&phrase_list("Canonical confirmation phrases", PRIMARY_CONFIRMATIONS));
    prompt.push_str(&phrase_list("Secondary confirmation phrases", MEDIUM_CONFIRMATIONS));
    prompt.push_str(&phrase_list("Negative closure phrases", NEGATIVE_CLOSURES));

    prompt.push_str(
        "\nRespond with a single JSON object and nothing else, with exactly these keys:\n\
         {\"purchase_intent\": bool, \"intent_type\": string, \"primary_concern\": string,\n\
         \"suggested_response\": string, \"confidence\": number between 0 and 1,\n\
         \"detected_phrases\": array of strings}\n\
         purchase_intent must be true only when intent_type is ready_to_purchase.\n",
    );

    prompt
}

fn phrase_list(label: &str, phrases: &[&str]) -> String {
    format!("{label}: {}.\n", phrases.join("; "))
}

#[cfg(test)]
mod tests {
    use leadly_core::{LeadContext, LeadId};

    use super::build_classification_prompt;

    fn lead() -> LeadContext {
        LeadContext {
            lead_id: LeadId("L-42".to_string()),
            name: "Dana Reyes".to_string(),
            organization: "Harbor Labs".to_string(),
            program: "Spring Cohort".to_string(),
        }
    }

    #[test]
    fn prompt_is_deterministic() {
        let first = build_classification_prompt("sounds good", &lead(), Some("Re: enrollment"));
        let second = build_classification_prompt("sounds good", &lead(), Some("Re: enrollment"));
        assert_eq!(first, second);
    }

    #[test]
    fn prompt_embeds_context_and_categories() {
        let prompt = build_classification_prompt("what does it cost?", &lead(), None);
        assert!(prompt.contains("Dana Reyes"));
        assert!(prompt.contains("Harbor Labs"));
        assert!(prompt.contains("what does it cost?"));
        assert!(prompt.contains("ready_to_purchase"));
        assert!(prompt.contains("not_interested"));
        assert!(prompt.contains("lock it in"));
        assert!(prompt.contains("not interested"));
    }

    #[test]
    fn subject_line_is_optional() {
        let without = build_classification_prompt("hello", &lead(), None);
        assert!(!without.contains("Reply subject"));

        let with = build_classification_prompt("hello", &lead(), Some("Re: invoice"));
        assert!(with.contains("Reply subject: Re: invoice"));
    }
}
