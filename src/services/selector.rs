use serde::Deserialize;
use std::sync::Arc;

use crate::{
    models::{PreferenceProfile, Product, SelectionError, SelectionResult},
    services::providers::{CallFailure, ChatMessage, ChatProvider, ChatRequest, FailureKind},
};

/// Candidates per garment class shown to the model
pub const PROMPT_CANDIDATES: usize = 4;

/// Preferred keywords summarized in the prompt
pub const PROMPT_KEYWORDS: usize = 5;

const SYSTEM_PROMPT: &str = "You are a fashion stylist. Choose exactly one top and one bottom \
that work together for the user. Reply with a single JSON object and nothing else: \
{\"top_id\": string, \"bottom_id\": string, \"outfit_name\": string, \"style_notes\": string}. \
Use only ids from the lists you are given.";

/// Shape the model is asked to reply with
#[derive(Debug, Deserialize)]
struct ModelChoice {
    top_id: String,
    bottom_id: String,
    #[serde(default)]
    outfit_name: String,
    #[serde(default)]
    style_notes: String,
}

/// Picks a top and bottom, preferring the language model's choice
///
/// The model only ever narrows the choice: its answer is validated against
/// the candidate lists, and every failure degrades to the rank-order heads.
pub struct OutfitSelector {
    provider: Option<Arc<dyn ChatProvider>>,
    model: String,
    temperature: f64,
}

impl OutfitSelector {
    pub fn new(provider: Option<Arc<dyn ChatProvider>>, model: String, temperature: f64) -> Self {
        Self {
            provider,
            model,
            temperature,
        }
    }

    /// Selects an outfit from rank-ordered `tops` and `bottoms`
    ///
    /// Never fails: problems are reported in `SelectionResult::error`, and
    /// ids are present whenever both lists are non-empty.
    pub async fn select(
        &self,
        tops: &[Product],
        bottoms: &[Product],
        profile: &PreferenceProfile,
        last_top_id: Option<&str>,
        last_bottom_id: Option<&str>,
    ) -> SelectionResult {
        if tops.is_empty() || bottoms.is_empty() {
            tracing::warn!(
                tops = tops.len(),
                bottoms = bottoms.len(),
                "Not enough items for an outfit, skipping model call"
            );
            let error = SelectionError::InsufficientItems {
                tops: tops.len(),
                bottoms: bottoms.len(),
            };
            return fallback(tops, bottoms, last_top_id, last_bottom_id, error);
        }

        let request = self.build_request(tops, bottoms, profile, last_top_id, last_bottom_id);

        let content = match self.call(&request).await {
            Ok(content) => content,
            Err(failure) => {
                tracing::warn!(
                    kind = %failure.kind,
                    error = %failure.message,
                    "Outfit selection call failed, using fallback"
                );
                let error = match failure.kind {
                    FailureKind::BadResponse => {
                        SelectionError::InvalidResponseFormat(failure.message)
                    }
                    _ => SelectionError::CallFailed(failure.to_string()),
                };
                return fallback(tops, bottoms, last_top_id, last_bottom_id, error);
            }
        };

        let choice: ModelChoice = match serde_json::from_str(strip_code_fence(&content)) {
            Ok(choice) => choice,
            Err(e) => {
                tracing::warn!(error = %e, content = %content, "Model reply is not valid JSON");
                let error = SelectionError::InvalidResponseFormat(e.to_string());
                return fallback(tops, bottoms, last_top_id, last_bottom_id, error);
            }
        };

        let mut unknown = Vec::new();
        if !tops.iter().any(|t| t.id == choice.top_id) {
            unknown.push(format!("top {}", choice.top_id));
        }
        if !bottoms.iter().any(|b| b.id == choice.bottom_id) {
            unknown.push(format!("bottom {}", choice.bottom_id));
        }
        if !unknown.is_empty() {
            tracing::warn!(unknown = ?unknown, "Model chose ids outside the catalog");
            let error = SelectionError::IdsNotInCatalog(unknown.join(", "));
            return fallback(tops, bottoms, last_top_id, last_bottom_id, error);
        }

        tracing::info!(
            top_id = %choice.top_id,
            bottom_id = %choice.bottom_id,
            "Model selected outfit"
        );

        let mut result = SelectionResult {
            top_id: Some(choice.top_id),
            bottom_id: Some(choice.bottom_id),
            outfit_name: choice.outfit_name,
            style_notes: choice.style_notes,
            error: None,
        };
        enforce_diversity(&mut result, tops, bottoms, last_top_id, last_bottom_id);
        result
    }

    async fn call(&self, request: &ChatRequest) -> Result<String, CallFailure> {
        match &self.provider {
            Some(provider) => {
                tracing::debug!(provider = provider.name(), model = %request.model, "Requesting outfit");
                provider.complete(request).await
            }
            None => Err(CallFailure::new(
                FailureKind::NotConfigured,
                "no chat provider configured",
            )),
        }
    }

    fn build_request(
        &self,
        tops: &[Product],
        bottoms: &[Product],
        profile: &PreferenceProfile,
        last_top_id: Option<&str>,
        last_bottom_id: Option<&str>,
    ) -> ChatRequest {
        let mut prompt = String::new();

        let keywords = profile.top_keywords(PROMPT_KEYWORDS);
        if keywords.is_empty() {
            prompt.push_str("The user has not expressed any preferences yet.\n");
        } else {
            let summary: Vec<String> = keywords
                .iter()
                .map(|(keyword, count)| format!("{} ({})", keyword, count))
                .collect();
            prompt.push_str(&format!("Preferred styles: {}\n", summary.join(", ")));
        }

        prompt.push_str("\nTops:\n");
        push_candidates(&mut prompt, tops);
        prompt.push_str("\nBottoms:\n");
        push_candidates(&mut prompt, bottoms);

        if last_top_id.is_some() || last_bottom_id.is_some() {
            prompt.push_str(&format!(
                "\nThe previous outfit used top {} and bottom {}. Pick different pieces if you can.\n",
                last_top_id.unwrap_or("-"),
                last_bottom_id.unwrap_or("-"),
            ));
        }

        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
            temperature: self.temperature,
        }
    }
}

fn push_candidates(prompt: &mut String, items: &[Product]) {
    for item in items.iter().take(PROMPT_CANDIDATES) {
        prompt.push_str(&format!(
            "- id: {} | {} | {} {:.2} | keywords: {}\n",
            item.id,
            item.name,
            item.currency,
            item.price,
            item.keywords.join(", ")
        ));
    }
}

/// Accepts replies wrapped in a markdown code fence
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_suffix("```").unwrap_or(rest);
            // Drop an info string such as `json` or `JSON` on the opening line
            match rest.split_once('\n') {
                Some((info, body)) if !info.trim_start().starts_with('{') => body.trim(),
                _ => rest.trim(),
            }
        }
        None => trimmed,
    }
}

/// The rank-order heads of each list
fn fallback(
    tops: &[Product],
    bottoms: &[Product],
    last_top_id: Option<&str>,
    last_bottom_id: Option<&str>,
    error: SelectionError,
) -> SelectionResult {
    let top = tops.first();
    let bottom = bottoms.first();

    let outfit_name = match (top, bottom) {
        (Some(t), Some(b)) => format!("{} with {}", t.name, b.name),
        _ => "Incomplete outfit".to_string(),
    };

    let mut result = SelectionResult {
        top_id: top.map(|t| t.id.clone()),
        bottom_id: bottom.map(|b| b.id.clone()),
        outfit_name,
        style_notes: "Picked from your highest-ranked pieces.".to_string(),
        error: Some(error),
    };
    enforce_diversity(&mut result, tops, bottoms, last_top_id, last_bottom_id);
    result
}

/// Replaces a top or bottom that repeats the previous outfit
///
/// Applies to both classes independently and only when an alternative
/// exists.
fn enforce_diversity(
    result: &mut SelectionResult,
    tops: &[Product],
    bottoms: &[Product],
    last_top_id: Option<&str>,
    last_bottom_id: Option<&str>,
) {
    if let Some(replacement) = replacement_for(result.top_id.as_deref(), last_top_id, tops) {
        tracing::info!(
            repeated = ?last_top_id,
            replacement = %replacement.id,
            "Swapping repeated top"
        );
        append_note(
            &mut result.style_notes,
            &format!("Swapped in {} to avoid repeating your last top.", replacement.name),
        );
        result.top_id = Some(replacement.id.clone());
    }

    if let Some(replacement) = replacement_for(result.bottom_id.as_deref(), last_bottom_id, bottoms)
    {
        tracing::info!(
            repeated = ?last_bottom_id,
            replacement = %replacement.id,
            "Swapping repeated bottom"
        );
        append_note(
            &mut result.style_notes,
            &format!(
                "Swapped in {} to avoid repeating your last bottom.",
                replacement.name
            ),
        );
        result.bottom_id = Some(replacement.id.clone());
    }
}

fn replacement_for<'a>(
    chosen: Option<&str>,
    last: Option<&str>,
    candidates: &'a [Product],
) -> Option<&'a Product> {
    match (chosen, last) {
        (Some(chosen), Some(last)) if chosen == last && candidates.len() > 1 => {
            candidates.iter().find(|c| c.id != last)
        }
        _ => None,
    }
}

fn append_note(notes: &mut String, note: &str) {
    if !notes.is_empty() {
        notes.push(' ');
    }
    notes.push_str(note);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::services::providers::MockChatProvider;

    fn product(id: &str, name: &str, category: Category) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            price: 40.0,
            currency: "USD".to_string(),
            keywords: vec![],
            category,
        }
    }

    fn tops() -> Vec<Product> {
        vec![
            product("T1", "Graphic Tee", Category::Top),
            product("T2", "Plain Tee", Category::Top),
        ]
    }

    fn bottoms() -> Vec<Product> {
        vec![
            product("B1", "Cargo Pants", Category::Bottom),
            product("B2", "Wide Jeans", Category::Bottom),
        ]
    }

    fn profile() -> PreferenceProfile {
        [("graphic".to_string(), 3), ("cargo".to_string(), 1)]
            .into_iter()
            .collect()
    }

    fn selector_replying(reply: &'static str) -> OutfitSelector {
        let mut mock = MockChatProvider::new();
        mock.expect_complete()
            .times(1)
            .returning(move |_| Ok(reply.to_string()));
        mock.expect_name().return_const("mock");
        OutfitSelector::new(Some(Arc::new(mock)), "test-model".to_string(), 0.7)
    }

    fn selector_failing(kind: FailureKind) -> OutfitSelector {
        let mut mock = MockChatProvider::new();
        mock.expect_complete()
            .times(1)
            .returning(move |_| Err(CallFailure::new(kind, "simulated")));
        mock.expect_name().return_const("mock");
        OutfitSelector::new(Some(Arc::new(mock)), "test-model".to_string(), 0.7)
    }

    #[tokio::test]
    async fn test_valid_model_choice_is_used() {
        let selector = selector_replying(
            r#"{"top_id":"T2","bottom_id":"B2","outfit_name":"Easy Sunday","style_notes":"Relaxed."}"#,
        );

        let result = selector.select(&tops(), &bottoms(), &profile(), None, None).await;

        assert_eq!(result.pair(), Some(("T2", "B2")));
        assert_eq!(result.outfit_name, "Easy Sunday");
        assert_eq!(result.style_notes, "Relaxed.");
        assert_eq!(result.error, None);
    }

    #[tokio::test]
    async fn test_disabled_provider_falls_back_to_heads() {
        let selector = OutfitSelector::new(None, "test-model".to_string(), 0.7);

        let result = selector.select(&tops(), &bottoms(), &profile(), None, None).await;

        assert_eq!(result.pair(), Some(("T1", "B1")));
        assert!(matches!(result.error, Some(SelectionError::CallFailed(_))));
    }

    #[tokio::test]
    async fn test_empty_list_never_calls_model() {
        let mut mock = MockChatProvider::new();
        mock.expect_complete().times(0);
        let selector = OutfitSelector::new(Some(Arc::new(mock)), "m".to_string(), 0.7);

        let result = selector.select(&[], &bottoms(), &profile(), None, None).await;

        assert_eq!(result.top_id, None);
        assert_eq!(result.bottom_id.as_deref(), Some("B1"));
        assert!(matches!(
            result.error,
            Some(SelectionError::InsufficientItems { tops: 0, bottoms: 2 })
        ));
    }

    #[tokio::test]
    async fn test_timeout_reports_call_failed() {
        let result = selector_failing(FailureKind::Timeout)
            .select(&tops(), &bottoms(), &profile(), None, None)
            .await;

        assert_eq!(result.pair(), Some(("T1", "B1")));
        assert!(matches!(result.error, Some(SelectionError::CallFailed(_))));
    }

    #[tokio::test]
    async fn test_non_json_reply_is_invalid_format() {
        let result = selector_replying("I'd go with the graphic tee!")
            .select(&tops(), &bottoms(), &profile(), None, None)
            .await;

        assert_eq!(result.pair(), Some(("T1", "B1")));
        assert!(matches!(
            result.error,
            Some(SelectionError::InvalidResponseFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_reply_missing_keys_is_invalid_format() {
        let result = selector_replying(r#"{"top_id":"T2"}"#)
            .select(&tops(), &bottoms(), &profile(), None, None)
            .await;

        assert!(matches!(
            result.error,
            Some(SelectionError::InvalidResponseFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_fenced_reply_is_accepted() {
        let result = selector_replying(
            "```json\n{\"top_id\":\"T2\",\"bottom_id\":\"B1\",\"outfit_name\":\"x\",\"style_notes\":\"y\"}\n```",
        )
        .select(&tops(), &bottoms(), &profile(), None, None)
        .await;

        assert_eq!(result.pair(), Some(("T2", "B1")));
        assert_eq!(result.error, None);
    }

    #[tokio::test]
    async fn test_unknown_ids_fall_back() {
        let result = selector_replying(
            r#"{"top_id":"T9","bottom_id":"B1","outfit_name":"x","style_notes":"y"}"#,
        )
        .select(&tops(), &bottoms(), &profile(), None, None)
        .await;

        assert_eq!(result.pair(), Some(("T1", "B1")));
        assert_eq!(
            result.error,
            Some(SelectionError::IdsNotInCatalog("top T9".to_string()))
        );
    }

    #[tokio::test]
    async fn test_ids_beyond_prompt_window_are_valid() {
        let tops: Vec<Product> = (1..=6)
            .map(|i| product(&format!("T{i}"), &format!("Top {i}"), Category::Top))
            .collect();
        let selector = selector_replying(
            r#"{"top_id":"T6","bottom_id":"B2","outfit_name":"x","style_notes":"y"}"#,
        );

        let result = selector.select(&tops, &bottoms(), &profile(), None, None).await;

        assert_eq!(result.pair(), Some(("T6", "B2")));
        assert_eq!(result.error, None);
    }

    #[tokio::test]
    async fn test_repeated_top_is_swapped() {
        let selector = selector_replying(
            r#"{"top_id":"T1","bottom_id":"B2","outfit_name":"Again","style_notes":"Bold."}"#,
        );

        let result = selector
            .select(&tops(), &bottoms(), &profile(), Some("T1"), Some("B1"))
            .await;

        assert_eq!(result.pair(), Some(("T2", "B2")));
        assert!(result.style_notes.starts_with("Bold."));
        assert!(result.style_notes.contains("avoid repeating your last top"));
        assert_eq!(result.error, None);
    }

    #[tokio::test]
    async fn test_repeat_kept_when_no_alternative() {
        let single_top = vec![product("T1", "Graphic Tee", Category::Top)];
        let selector = selector_replying(
            r#"{"top_id":"T1","bottom_id":"B2","outfit_name":"x","style_notes":""}"#,
        );

        let result = selector
            .select(&single_top, &bottoms(), &profile(), Some("T1"), None)
            .await;

        assert_eq!(result.top_id.as_deref(), Some("T1"));
        assert!(result.style_notes.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_avoids_repeating_heads() {
        let selector = OutfitSelector::new(None, "m".to_string(), 0.7);

        let result = selector
            .select(&tops(), &bottoms(), &profile(), Some("T1"), Some("B1"))
            .await;

        assert_eq!(result.pair(), Some(("T2", "B2")));
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_fallback_is_deterministic() {
        let selector = OutfitSelector::new(None, "m".to_string(), 0.7);

        let first = selector.select(&tops(), &bottoms(), &profile(), None, None).await;
        let second = selector.select(&tops(), &bottoms(), &profile(), None, None).await;

        assert_eq!(first, second);
    }

    #[test]
    fn test_prompt_is_bounded_and_mentions_last_outfit() {
        let many_tops: Vec<Product> = (1..=10)
            .map(|i| product(&format!("T{i}"), &format!("Top {i}"), Category::Top))
            .collect();
        let selector = OutfitSelector::new(None, "m".to_string(), 0.2);

        let request = selector.build_request(&many_tops, &bottoms(), &profile(), Some("T3"), None);
        let prompt = &request.messages[1].content;

        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.temperature, 0.2);
        assert!(prompt.contains("id: T4 "));
        assert!(!prompt.contains("id: T5 "));
        assert!(prompt.contains("graphic (3), cargo (1)"));
        assert!(prompt.contains("previous outfit used top T3"));
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```JSON\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```jsonc \r\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```{\"a\":1}```"), "{\"a\":1}");
    }
}
