//! `vith_item_total{source,kind,item_type,state}` — one counter sample per
//! terminal request outcome, exposed on `/metrics` the way the teacher's
//! own `REGISTRY` is scraped.

use prometheus::{register_int_counter_vec_with_registry, Encoder, IntCounterVec, Registry, TextEncoder};

pub static REGISTRY: std::sync::LazyLock<Registry> = std::sync::LazyLock::new(Registry::new);

pub static ITEM_TOTAL: std::sync::LazyLock<IntCounterVec> = std::sync::LazyLock::new(|| {
    register_int_counter_vec_with_registry!(
        "vith_item_total",
        "Total derivation requests by outcome",
        &["source", "kind", "item_type", "state"],
        REGISTRY.clone()
    )
    .expect("failed to register vith_item_total")
});

pub fn record(source: &str, kind: &str, item_type: &str, state: &str) {
    ITEM_TOTAL.with_label_values(&[source, kind, item_type, state]).inc();
}

pub fn encode() -> Result<Vec<u8>, prometheus::Error> {
    let mut buf = Vec::new();
    let encoder = TextEncoder::new();
    encoder.encode(&REGISTRY.gather(), &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_increments_labeled_counter() {
        record("http", "thumbnail", "image", "success");
        let value = ITEM_TOTAL.with_label_values(&["http", "thumbnail", "image", "success"]).get();
        assert!(value >= 1);
    }
}
