use serde::{Deserialize, Serialize};

// -- Users --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineUser {
    pub username: String,
    pub remote_addr: String,
    pub local_addr: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersResponse {
    pub count: usize,
    pub users: Vec<OnlineUser>,
}

// -- Search --

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: i64,
    pub username: String,
    pub content: String,
    pub time: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub count: usize,
}

// -- Preferences --

#[derive(Debug, Deserialize)]
pub struct PreferencesQuery {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    pub theme: String,
    pub notifications: bool,
    pub language: String,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            notifications: true,
            language: "en".to_string(),
        }
    }
}
