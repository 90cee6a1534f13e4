//! Plan and action decoding.
//!
//! Wire shape:
//!
//! ```json
//! [{"action": "create_network", "parameters": {"name": "net1"}}, ...]
//! ```
//!
//! Unknown keys on an entry are ignored and a missing `parameters` field is
//! an empty bag. Entry shape is checked lazily, one entry at a time, so a
//! bad entry halts the plan at its own position.

use rmcp::model::JsonObject;
use serde_json::Value;

use crate::error::PlanError;
use crate::types::ToolName;

/// One step of a plan: a tool name plus its parameter bag.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub name: ToolName,
    pub parameters: JsonObject,
}

impl Action {
    pub fn new(name: impl Into<ToolName>, parameters: JsonObject) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    /// Build an action from the entry at `index`; entries that are not
    /// objects have an invalid shape.
    pub fn from_entry(index: usize, entry: &Value) -> Result<Self, PlanError> {
        let entry = entry
            .as_object()
            .ok_or(PlanError::InvalidActionShape { index })?;
        let name = entry
            .get("action")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or(PlanError::InvalidActionShape { index })?;

        let parameters = match entry.get("parameters") {
            Some(Value::Object(params)) => params.clone(),
            _ => JsonObject::new(),
        };

        Ok(Self::new(name, parameters))
    }
}

/// An ordered, non-empty sequence of plan entries.
#[derive(Debug, Clone)]
pub struct Plan {
    entries: Vec<Value>,
}

impl Plan {
    /// Decode plan text; rejects malformed JSON and empty plans.
    pub fn parse(input: &str) -> Result<Self, PlanError> {
        if input.trim().is_empty() {
            return Err(PlanError::EmptyPlan);
        }

        let entries: Vec<Value> = serde_json::from_str(input)
            .map_err(|e| PlanError::MalformedInput(e.to_string()))?;

        Self::from_entries(entries)
    }

    pub fn from_entries(entries: Vec<Value>) -> Result<Self, PlanError> {
        if entries.is_empty() {
            return Err(PlanError::EmptyPlan);
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Actions in submission order, each decoded on demand.
    pub fn actions(&self) -> impl Iterator<Item = Result<Action, PlanError>> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| Action::from_entry(index, entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_preserves_order() {
        let plan = Plan::parse(
            r#"[{"action":"create_network","parameters":{"name":"net1"}},
                {"action":"run_container","parameters":{"name":"c1"}}]"#,
        )
        .unwrap();

        let names: Vec<String> = plan
            .actions()
            .map(|a| a.unwrap().name.into_inner())
            .collect();
        assert_eq!(names, vec!["create_network", "run_container"]);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(Plan::parse("").unwrap_err(), PlanError::EmptyPlan);
        assert_eq!(Plan::parse("  \n").unwrap_err(), PlanError::EmptyPlan);
        assert_eq!(Plan::parse("[]").unwrap_err(), PlanError::EmptyPlan);
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(matches!(
            Plan::parse("{not json"),
            Err(PlanError::MalformedInput(_))
        ));
        assert!(matches!(
            Plan::parse(r#"{"action":"create_network"}"#),
            Err(PlanError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_non_object_entry_fails_at_its_position() {
        let plan = Plan::parse(r#"[{"action":"create_volume","parameters":{"name":"v"}}, null, "create_network"]"#)
            .unwrap();
        let results: Vec<_> = plan.actions().collect();
        assert!(results[0].is_ok());
        assert_eq!(results[1], Err(PlanError::InvalidActionShape { index: 1 }));
        assert_eq!(results[2], Err(PlanError::InvalidActionShape { index: 2 }));
    }

    #[test]
    fn test_missing_parameters_is_empty_bag() {
        let plan = Plan::parse(r#"[{"action":"create_volume","comment":"ignored"}]"#).unwrap();
        let action = plan.actions().next().unwrap().unwrap();
        assert_eq!(action.name.as_str(), "create_volume");
        assert!(action.parameters.is_empty());
    }

    #[test]
    fn test_entry_without_name_is_invalid_shape() {
        let entry = json!({"parameters": {"name": "x"}});
        let err = Action::from_entry(2, &entry).unwrap_err();
        assert_eq!(err, PlanError::InvalidActionShape { index: 2 });

        let entry = json!({"action": ""});
        assert!(Action::from_entry(0, &entry).is_err());

        let entry = json!({"action": 7});
        assert!(Action::from_entry(0, &entry).is_err());
    }
}
