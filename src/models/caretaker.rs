use serde::{Deserialize, Serialize};

/// Person looking after the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caretaker {
    pub id: i64,
    pub caretaker_name: String,
    #[serde(default)]
    pub caretaker_phone: Option<String>,
    #[serde(default)]
    pub relationship: Option<String>,
}

/// Body for creating or updating a caretaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaretakerRequest {
    pub caretaker_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caretaker_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

impl From<&Caretaker> for CaretakerRequest {
    fn from(caretaker: &Caretaker) -> Self {
        Self {
            caretaker_name: caretaker.caretaker_name.clone(),
            caretaker_phone: caretaker.caretaker_phone.clone(),
            relationship: caretaker.relationship.clone(),
        }
    }
}
