use serde::{Deserialize, Serialize};

/// The caller's identity as carried in a verified token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: i64,
    pub email: String,
    pub name: String,
}
