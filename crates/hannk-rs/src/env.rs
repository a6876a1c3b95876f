use std::env;
use std::sync::OnceLock;

static HANNK_VALIDATE_GRAPH: OnceLock<bool> = OnceLock::new();
static HANNK_ZERO_INIT: OnceLock<bool> = OnceLock::new();

/// Byte written into fresh allocations when zero-initialisation is switched off.
pub(crate) const UNINIT_FILL_BYTE: u8 = 0xCD;

fn parse_bool(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
}

fn flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => parse_bool(&value),
        _ => default,
    }
}

/// Re-check op ordering after every `Model::insert_op` (`HANNK_VALIDATE_GRAPH`).
pub(crate) fn validate_graph_enabled() -> bool {
    *HANNK_VALIDATE_GRAPH.get_or_init(|| flag("HANNK_VALIDATE_GRAPH", false))
}

/// Zero fresh storage allocations (`HANNK_ZERO_INIT`, on unless explicitly disabled).
pub(crate) fn zero_init_enabled() -> bool {
    *HANNK_ZERO_INIT.get_or_init(|| flag("HANNK_ZERO_INIT", true))
}
