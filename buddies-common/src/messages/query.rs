use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CandidateQuery {
    pub q: String,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleFilter {
    Receiver,
    Joiner,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RoleQuery {
    pub role: RoleFilter,
}
