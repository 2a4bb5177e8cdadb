//! Storage authorization returned by the metadata API.

use std::collections::BTreeMap;

/// Signed storage policy for one upload.
///
/// All values are opaque and passed to the storage endpoint unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Base64 policy document.
    pub policy: String,
    /// Key prefix the storage object is placed under.
    pub prefix: String,
    /// Storage access key id.
    pub access_key_id: String,
    /// Signature of the policy document.
    pub signature: String,
    /// Canned ACL applied to the stored object.
    pub acl: String,
}

impl UploadPolicy {
    /// Builds the policy from the fields of the authorization document.
    ///
    /// Returns the name of the first missing field on failure.
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Result<Self, &'static str> {
        let field = |name: &'static str| fields.get(name).cloned().ok_or(name);

        Ok(Self {
            policy: field("policy")?,
            prefix: field("prefix")?,
            access_key_id: field("accesskeyid")?,
            signature: field("signature")?,
            acl: field("acl")?,
        })
    }

    /// Storage key of the object: the prefix followed by the file name.
    pub fn key(&self, file_name: &str) -> String {
        format!("{}{}", self.prefix, file_name)
    }
}
