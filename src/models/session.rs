use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatorRole {
    Admin,
    Manager,
    Driver,
}

impl OperatorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorRole::Admin => "ADMIN",
            OperatorRole::Manager => "MANAGER",
            OperatorRole::Driver => "DRIVER",
        }
    }

    pub fn can_dispatch(&self) -> bool {
        matches!(self, OperatorRole::Admin | OperatorRole::Manager)
    }
}

impl fmt::Display for OperatorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(OperatorRole::Admin),
            "MANAGER" => Ok(OperatorRole::Manager),
            "DRIVER" => Ok(OperatorRole::Driver),
            other => Err(format!(
                "unknown role: {other}, expected ADMIN/MANAGER/DRIVER"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub operator_id: String,
    pub role: OperatorRole,
}

impl Session {
    pub fn new(operator_id: impl Into<String>, role: OperatorRole) -> Self {
        Self {
            operator_id: operator_id.into(),
            role,
        }
    }
}
