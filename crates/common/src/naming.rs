//! Fully qualified action names and the downstream endpoints derived from them.
//!
//! The host addresses actions as `/namespace/package/action`. A deployment's
//! package is named `{deploy}_{channel}` (e.g. `acme_slack`), so the tenant
//! prefix is everything before the first underscore of the package segment.

use std::fmt;

use crate::error::{Error, Result};

/// Suffix of the action that posts one fragment for a deployment.
pub const POST_SEQUENCE_SUFFIX: &str = "_postsequence";

/// A parsed `/namespace/package/action` name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionName {
    pub namespace: String,
    pub package: Option<String>,
    pub action: String,
}

impl ActionName {
    /// Parse a fully qualified action name.
    ///
    /// Accepts `/ns/pkg/action`, `/ns/action` (no package) and the same
    /// forms without the leading slash.
    pub fn parse(name: &str) -> Result<Self> {
        let segments: Vec<&str> = name.trim_start_matches('/').split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(Error::validation(format!("malformed action name: {name:?}")));
        }
        match segments.as_slice() {
            [namespace, action] => Ok(Self {
                namespace: (*namespace).to_string(),
                package: None,
                action: (*action).to_string(),
            }),
            [namespace, package, action] => Ok(Self {
                namespace: (*namespace).to_string(),
                package: Some((*package).to_string()),
                action: (*action).to_string(),
            }),
            _ => Err(Error::validation(format!("malformed action name: {name:?}"))),
        }
    }

    /// Tenant prefix: the package segment up to its first underscore.
    pub fn deploy_name(&self) -> Result<&str> {
        let package = self.package.as_deref().ok_or_else(|| {
            Error::validation(format!("action {self} is not inside a package"))
        })?;
        let deploy = package.split('_').next().unwrap_or(package);
        if deploy.is_empty() {
            return Err(Error::validation(format!(
                "package {package:?} has an empty deployment prefix"
            )));
        }
        Ok(deploy)
    }

    /// Name of the post-sequence action for this action's deployment.
    pub fn post_sequence_target(&self) -> Result<String> {
        Ok(post_sequence_target(self.deploy_name()?))
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package {
            Some(package) => write!(f, "/{}/{}/{}", self.namespace, package, self.action),
            None => write!(f, "/{}/{}", self.namespace, self.action),
        }
    }
}

/// `{deploy_name}_postsequence`.
#[must_use]
pub fn post_sequence_target(deploy_name: &str) -> String {
    format!("{deploy_name}{POST_SEQUENCE_SUFFIX}")
}
