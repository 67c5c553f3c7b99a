//! Integration coverage for service names, pipelines, and duration rendering.

use proptest::prelude::*;
use std::time::Duration;
use tundra_domain::{
    InvokeState, Pipeline, PrimitiveError, ServiceDescriptor, ServiceName, format_xml_duration,
};
use tundra_shared::ErrorEnvelope;

#[test]
fn descriptor_and_state_compose() -> Result<(), PrimitiveError> {
    let descriptor = ServiceDescriptor::parse("tundra.list:sort", "Tundra")?;
    let state = InvokeState::parse("sess-1", "Administrator")?;

    assert_eq!(descriptor.name.interface(), "tundra.list");
    assert_eq!(descriptor.package.as_str(), "Tundra");
    assert_eq!(state.user.as_str(), "Administrator");
    Ok(())
}

#[test]
fn primitive_errors_map_into_error_envelopes() -> Result<(), PrimitiveError> {
    let Err(error) = InvokeState::parse(" ", "user") else {
        return Err(PrimitiveError::EmptySessionId { input_length: 0 });
    };

    let envelope: ErrorEnvelope = error.into();
    assert_eq!(envelope.code.namespace(), "domain");
    assert_eq!(envelope.code.code(), "invalid_session_id");
    assert_eq!(
        envelope.metadata.get("input_length").map(String::as_str),
        Some("1")
    );
    Ok(())
}

#[test]
fn pipeline_serializes_as_plain_object() -> Result<(), serde_json::Error> {
    let pipeline = Pipeline::new().with("x", 1).with("y", "two");
    let encoded = serde_json::to_string(&pipeline)?;
    assert_eq!(encoded, r#"{"x":1,"y":"two"}"#);
    Ok(())
}

fn segment() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_]{0,8}"
}

proptest! {
    #[test]
    fn well_formed_service_names_round_trip(
        folders in prop::collection::vec(segment(), 1..4),
        local in segment(),
    ) {
        let full = format!("{}:{local}", folders.join("."));
        let parsed = ServiceName::parse(&full);
        prop_assert!(parsed.is_ok());
        if let Ok(name) = parsed {
            prop_assert_eq!(name.as_str(), full.as_str());
            prop_assert_eq!(name.interface(), folders.join("."));
            prop_assert_eq!(name.local_name(), local.as_str());
        }
    }

    #[test]
    fn xml_durations_are_well_formed(millis in 0u64..1_000_000_000) {
        let rendered = format_xml_duration(Duration::from_millis(millis));
        prop_assert!(rendered.starts_with('P'));
        prop_assert!(rendered.len() > 1);
        prop_assert!(!rendered.ends_with('T'));
        prop_assert!(!rendered.contains(".S"));
    }
}
