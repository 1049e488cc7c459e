use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        PortraitError::not_found("x")
            .to_string()
            .contains("not found:")
    );
    assert!(
        PortraitError::decode("x")
            .to_string()
            .contains("decode error:")
    );
    assert!(
        PortraitError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        PortraitError::stale_undo("x")
            .to_string()
            .contains("stale undo:")
    );
    assert!(
        PortraitError::PoolExhausted(100)
            .to_string()
            .contains("all 100 slots")
    );
}

#[test]
fn io_failure_keeps_source() {
    let err = PortraitError::io("copy source", std::io::Error::other("disk full"));
    assert!(err.to_string().contains("copy source"));
    let source = std::error::Error::source(&err).expect("io source");
    assert!(source.to_string().contains("disk full"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = PortraitError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn json_errors_map_to_serde() {
    let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err = PortraitError::from(bad);
    assert!(matches!(err, PortraitError::Serde(_)));
}
