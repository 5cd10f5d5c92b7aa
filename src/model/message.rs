use serde::{Deserialize, Serialize};

/// Abstract notification returned by the policy engine.
///
/// Every field is optional on the wire; missing values decode as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    pub channel: String,
    pub color: String,
    pub title: String,
    pub body: String,
    pub fields: Vec<MessageField>,
    // icon URL
    pub icon: String,
    // emoji name, e.g. ":fire:"
    pub emoji: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageField {
    pub name: String,
    pub value: String,
    pub link: String,
}
