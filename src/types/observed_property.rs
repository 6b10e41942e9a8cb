use serde::{Deserialize, Serialize};

/// A measured quantity exposed by observation backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedProperty {
    pub id: String,
    pub name: String,
    pub unit_of_measure: String,
}

impl ObservedProperty {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        unit_of_measure: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_of_measure: unit_of_measure.into(),
        }
    }
}
