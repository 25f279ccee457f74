//! Explicit session context passed to import and submission.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Who is working and against which collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Remote service user name.
    pub username: String,
    /// Organisation code used as sender id prefix.
    pub org_code: String,
    /// Address shown in fatal error notices.
    pub support_email: String,
    /// Data collection code per reporting year.
    pub data_collections: BTreeMap<String, String>,
    /// Report code used for connection tests.
    pub test_report_code: String,
}

impl Session {
    pub fn new(username: impl Into<String>, org_code: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            org_code: org_code.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_support_email(mut self, email: impl Into<String>) -> Self {
        self.support_email = email.into();
        self
    }

    #[must_use]
    pub fn with_data_collection(
        mut self,
        year: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        self.data_collections.insert(year.into(), code.into());
        self
    }

    /// Data collection code for a reporting year.
    pub fn data_collection_for(&self, year: &str) -> Option<&str> {
        self.data_collections.get(year.trim()).map(String::as_str)
    }

    pub fn is_logged_in(&self) -> bool {
        !self.username.trim().is_empty()
    }
}
