use std::fmt;

/// Routing key derived from the path after `/msg/`; `a/b/c` becomes `a.b.c`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Schema(String);

impl Schema {
    pub fn from_path(path: &str) -> Self {
        let trimmed = path.trim_matches('/');
        Self(trimmed.replace('/', "."))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Policy rule path of the notification query for this schema.
    pub fn to_query(&self) -> String {
        format!("data.msg.{}", self.0)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
