pub mod anchor;
pub mod apply;
pub mod connectivity;
pub mod edit;
pub mod error;
pub mod geometry;
pub mod highlight;
pub mod primitives;
pub mod settings;
pub mod store;
pub mod tracker;
pub mod transform;
pub mod types;
pub mod worker;

use std::path::Path;

use serde_json::Value;

pub use apply::apply_edit_events;
pub use edit::{EditEvent, EditEventLog, EditHost, Scene};
pub use error::InteractError;
pub use tracker::MouseElementTracker;
pub use transform::Matrix;
pub use types::{parse_circuit, AnyCircuitElement};

/// Read a circuit JSON file.
pub fn load_circuit(path: &Path) -> Result<Vec<AnyCircuitElement>, InteractError> {
    let data = std::fs::read_to_string(path)?;
    Ok(parse_circuit(&data)?)
}

/// Parse an edit event list. A single event object is accepted too.
pub fn parse_edit_events(json: &str) -> Result<Vec<EditEvent>, InteractError> {
    let events = match serde_json::from_str::<Value>(json)? {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?,
        single => vec![serde_json::from_value(single)?],
    };
    Ok(events)
}

pub fn load_edit_events(path: &Path) -> Result<Vec<EditEvent>, InteractError> {
    let data = std::fs::read_to_string(path)?;
    parse_edit_events(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_list_and_single_event() {
        let list = r#"[
            {"edit_event_type": "edit_pcb_component_location", "edit_event_id": "e1",
             "pcb_component_id": "c1", "original_center": {"x": 0, "y": 0},
             "new_center": {"x": 1, "y": 2}, "in_progress": false, "created_at": 0},
            {"edit_event_type": "edit_schematic_component_location", "edit_event_id": "e2"}
        ]"#;
        let events = parse_edit_events(list).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id(), Some("e1"));
        assert_eq!(events[1], EditEvent::Unknown);

        let single = r#"{"edit_event_type": "edit_trace_hint", "edit_event_id": "e3",
            "pcb_port_id": "p", "pcb_trace_hint_id": "h", "in_progress": true, "created_at": 1}"#;
        assert_eq!(parse_edit_events(single).unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_events_are_errors() {
        assert!(matches!(
            parse_edit_events("{not json"),
            Err(InteractError::Json(_))
        ));
        assert!(load_circuit(Path::new("/definitely/not/here.json")).is_err());
    }
}
