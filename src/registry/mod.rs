//! Provider Registry
//!
//! Selection policy over provider configurations: filter to eligible
//! candidates for a modality, then pick by model hint or priority.
//!
//! The model-hint matcher is a deliberate best-effort fuzzy match
//! (case-insensitive substring, both directions). Operators are expected
//! to name providers and models so the match is unambiguous; the policy
//! favors availability over precision and never fails a lookup just
//! because a hint matched nothing.

use crate::types::provider::{Modality, ProviderConfig};

/// Pick the provider that should handle a request.
///
/// Filters `configs` to those matching `modality`, enabled and carrying a
/// non-blank credential, then:
/// - with a `model_hint`, returns the first candidate (priority order,
///   recency tiebreak) whose name or declared model list fuzzy-matches;
/// - otherwise, or when nothing matches the hint, returns the
///   highest-priority candidate, most recently configured first on ties.
///
/// Returns `None` when no eligible candidate remains; the caller must fail
/// the task as `NoProviderAvailable` rather than letting it sit.
pub fn select_provider<'a>(
    configs: &'a [ProviderConfig],
    modality: Modality,
    model_hint: Option<&str>,
) -> Option<&'a ProviderConfig> {
    let mut candidates: Vec<&ProviderConfig> = configs
        .iter()
        .filter(|c| c.modality == modality && c.is_eligible())
        .collect();
    if candidates.is_empty() {
        return None;
    }
    candidates.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.updated_at.cmp(&a.updated_at))
    });

    if let Some(hint) = model_hint {
        let hint = hint.trim().to_lowercase();
        if !hint.is_empty()
            && let Some(found) = candidates.iter().find(|c| matches_hint(c, &hint))
        {
            return Some(found);
        }
    }

    candidates.first().copied()
}

/// Whether a configuration's name or declared models match the hint
fn matches_hint(config: &ProviderConfig, hint: &str) -> bool {
    fuzzy_contains(&config.name, hint) || config.models.iter().any(|m| fuzzy_contains(m, hint))
}

/// Case-insensitive substring match in either direction
fn fuzzy_contains(value: &str, lowered_hint: &str) -> bool {
    let value = value.to_lowercase();
    value.contains(lowered_hint) || lowered_hint.contains(&value)
}

/// Best-effort model family implied by a provider name.
///
/// Used to backfill a task's missing model hint after selection so the
/// stored record names what likely produced the media. Non-authoritative;
/// callers must not fail on a `None`.
pub fn implied_model_family(provider_name: &str) -> Option<&'static str> {
    let name = provider_name.to_lowercase();
    if name.contains("hailuo") || name.contains("minimax") {
        Some("MiniMax-Hailuo-2.3")
    } else if name.contains("sora") {
        Some("sora-2")
    } else if name.contains("dall") {
        Some("dall-e-3")
    } else if name.contains("flux") {
        Some("flux.1-dev")
    } else if name.contains("kling") {
        Some("kling-v1.6")
    } else {
        None
    }
}
