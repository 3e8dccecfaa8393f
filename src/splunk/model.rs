//! Splunk REST response shapes (`output_mode=json`)

use serde::{Deserialize, Serialize};

/// Atom-style listing returned by every collection endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct EntryList<T> {
    #[serde(default = "Vec::new")]
    pub entry: Vec<T>,
}

/// Saved search listing entry; only the name is needed
#[derive(Debug, Clone, Deserialize)]
pub struct NamedEntry {
    pub name: String,
}

/// Entry of `fired_alerts`, both for alert groups and their instances
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FiredAlert {
    pub name: String,
    #[serde(default)]
    pub links: AlertLinks,
    #[serde(default)]
    pub content: FiredAlertContent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertLinks {
    /// Listing of the instances of a fired alert group
    pub list: String,
    /// Search job that triggered the instance
    pub job: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiredAlertContent {
    pub sid: String,
    pub savedsearch_name: String,
    /// Unix seconds
    pub trigger_time: i64,
}

/// Answer to the creation of a search job
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobCreated {
    #[serde(default)]
    pub sid: String,
}

/// One row of search results, field name to value
pub type ResultRow = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobResults {
    #[serde(default)]
    pub results: Vec<ResultRow>,
}

/// Error body of a failed request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Messages {
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub text: String,
}

impl Messages {
    /// First message text of an error body, if it has one
    pub fn first_text(body: &str) -> Option<String> {
        serde_json::from_str::<Messages>(body)
            .ok()
            .and_then(|m| m.messages.into_iter().next())
            .map(|m| m.text)
            .filter(|text| !text.is_empty())
    }
}
