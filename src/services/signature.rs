use std::path::Path;

use crate::services::storage::{StorageResult, StorageService};

/// "ID3", the tag header every accepted upload must start with.
pub const ID3_SIGNATURE: [u8; 3] = [0x49, 0x44, 0x33];

/// Confirms the container format from the staged bytes alone.
///
/// The declared MIME type and extension come from the client; the leading
/// bytes are the only part of the decision the server reads for itself.
pub struct SignatureChecker {
    signature: &'static [u8],
}

impl SignatureChecker {
    pub fn new(signature: &'static [u8]) -> Self {
        Self { signature }
    }

    pub fn matches(&self, header: &[u8]) -> bool {
        header.len() >= self.signature.len() && header.starts_with(self.signature)
    }

    /// `Ok(false)` is a rejection, not a failure. Only an unreadable file is an error.
    pub async fn check(&self, storage: &dyn StorageService, path: &Path) -> StorageResult<bool> {
        let header = storage.read_header(path, self.signature.len()).await?;
        Ok(self.matches(&header))
    }
}

impl Default for SignatureChecker {
    fn default() -> Self {
        Self::new(&ID3_SIGNATURE)
    }
}
