//! The POST-object form.
//!
//! The storage service reads the multipart body as a stream and requires the
//! policy fields before the file part, in this order:
//!
//! ```text
//! key, policy, OSSAccessKeyId, signature, x-oss-security-token,
//! success_action_status=200, file
//! ```
//!
//! [`UploadForm`] keeps the fields as an ordered list so the order is a
//! property of the value, testable without a network, and
//! [`UploadForm::into_multipart`] preserves it.

use super::credentials::UploadCredentials;
use super::key::ObjectKey;
use super::policy::SignedPolicy;

/// One upload's form fields, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadForm {
    fields: Vec<(&'static str, String)>,
    file: FilePart,
}

/// The trailing `file` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadForm {
    pub fn new(
        key: &ObjectKey,
        policy: &SignedPolicy,
        credentials: &UploadCredentials,
        ext: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Self {
        let fields = vec![
            ("key", key.as_str().to_string()),
            ("policy", policy.encoded.clone()),
            ("OSSAccessKeyId", credentials.access_key_id.clone()),
            ("signature", policy.signature.clone()),
            ("x-oss-security-token", credentials.security_token.clone()),
            ("success_action_status", "200".to_string()),
        ];
        Self {
            fields,
            file: FilePart {
                file_name: format!("image.{ext}"),
                mime: mime.to_string(),
                bytes,
            },
        }
    }

    /// Text fields in wire order.
    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    pub fn file(&self) -> &FilePart {
        &self.file
    }

    /// Names of all parts in wire order, `file` last.
    pub fn part_names(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .map(|(name, _)| *name)
            .chain(std::iter::once("file"))
            .collect()
    }

    /// Value of a text field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Build the reqwest multipart body, keeping field order.
    pub fn into_multipart(self) -> Result<reqwest::multipart::Form, reqwest::Error> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in self.fields {
            form = form.text(name, value);
        }
        let part = reqwest::multipart::Part::bytes(self.file.bytes)
            .file_name(self.file.file_name)
            .mime_str(&self.file.mime)?;
        Ok(form.part("file", part))
    }
}
