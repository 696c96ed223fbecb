// Wire types for the simulation API.
//
// Most endpoints speak plain-text scalars; only the fan state endpoint
// returns a JSON object.

use serde::{Deserialize, Serialize};

/// Body of `GET api/fans/{id}/state`.
///
/// The simulation is inconsistent about casing, so both `isOn` and
/// `IsOn` are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanStatus {
    #[serde(alias = "Id", default)]
    pub id: u32,
    #[serde(alias = "IsOn", alias = "ison")]
    pub is_on: bool,
}
