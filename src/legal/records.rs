//! Entity records as they travel over the HTTP API.

use serde::{Deserialize, Serialize};

/// Sender label of the message every new chat starts with.
pub const SYSTEM_SENDER: &str = "System";
/// Text of the message every new chat starts with.
pub const WELCOME_TEXT: &str = "Welcome to the chat";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    /// Not maintained by any operation.
    pub cases: Vec<String>,
    pub first_name: String,
    pub last_name: String,
    pub organization: String,
    pub password: String,
    pub profile_picture: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Case {
    #[serde(rename = "_id")]
    pub id: String,
    pub case_title: String,
    pub attorney_first_name: String,
    pub attorney_last_name: String,
    pub case_info: String,
    pub case_type: String,
    pub city: String,
    pub date: String,
    pub judge_name: String,
    /// Best-effort count of successful uploads.
    pub number_files: i64,
    pub state: String,
    pub user_id: String,
}

impl Case {
    /// Names of required descriptive fields that are blank.
    pub fn blank_fields(&self) -> Vec<&'static str> {
        [
            ("case_title", &self.case_title),
            ("attorney_first_name", &self.attorney_first_name),
            ("attorney_last_name", &self.attorney_last_name),
            ("case_info", &self.case_info),
            ("case_type", &self.case_type),
            ("city", &self.city),
            ("date", &self.date),
            ("judge_name", &self.judge_name),
            ("state", &self.state),
            ("user_id", &self.user_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: String,
    /// Blob key the file was stored under.
    pub file_name: String,
    #[serde(rename = "case")]
    pub case_id: String,
    pub date: String,
    pub file_url: String,
    pub relevancy: f64,
    /// Always written `false`; nothing sets it.
    pub stored: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    pub text: String,
    pub sender: String,
    /// Caller-supplied; not validated as a timestamp.
    pub timestamp: String,
}

impl Message {
    pub fn welcome(timestamp: String) -> Self {
        Self {
            text: WELCOME_TEXT.to_string(),
            sender: SYSTEM_SENDER.to_string(),
            timestamp,
        }
    }
}

/// Message thread of one case. `id` is always the case id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    #[serde(rename = "_id")]
    pub id: String,
    pub messages: Vec<Message>,
    pub selected_docs: Vec<String>,
    pub user_id: String,
}
