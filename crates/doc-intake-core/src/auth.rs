//! Authorization seam: may this caller read the source file, and may it
//! create records of the target doctype?

use serde::{Deserialize, Serialize};

/// Wildcard entry granting every doctype.
pub const ANY_DOCTYPE: &str = "*";

pub trait Authorizer: Send + Sync {
    fn may_read_file(&self, file_name: &str) -> bool;
    fn may_create(&self, doctype: &str) -> bool;
}

/// Config-driven permissions. `create` lists doctypes (or `"*"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticAuthorizer {
    #[serde(default = "default_read_files")]
    pub read_files: bool,
    #[serde(default)]
    pub create: Vec<String>,
}

fn default_read_files() -> bool {
    true
}

impl Default for StaticAuthorizer {
    fn default() -> Self {
        Self {
            read_files: true,
            create: Vec::new(),
        }
    }
}

impl StaticAuthorizer {
    pub fn allow_all() -> Self {
        Self {
            read_files: true,
            create: vec![ANY_DOCTYPE.to_string()],
        }
    }
}

impl Authorizer for StaticAuthorizer {
    fn may_read_file(&self, _file_name: &str) -> bool {
        self.read_files
    }

    fn may_create(&self, doctype: &str) -> bool {
        self.create
            .iter()
            .any(|d| d == ANY_DOCTYPE || d.eq_ignore_ascii_case(doctype.trim()))
    }
}
