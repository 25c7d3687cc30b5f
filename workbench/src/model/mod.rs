pub mod annotation;
pub mod corpus;
pub mod extract;
pub mod import;
pub mod query;

pub use annotation::{Annotation, AnnotationLabel, LabelRef, LabelSet, LabelType, Relation};
pub use corpus::{
    Corpus, CorpusAction, CorpusActionTrigger, CorpusInput, CorpusPatch, CorpusStats, Document,
    Permission,
};
pub use extract::{Column, Datacell, Extract};
pub use import::{CorpusExport, ExportedDocument, ImportJob, ImportStatus, UploadPayload};
pub use query::CorpusQuery;

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Content-addressed id, `prefix` + sha256 hex of `content`.
pub fn compute_mdhash_id(content: &str, prefix: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    format!("{prefix}{hex}")
}

pub fn generate_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mdhash_is_stable_and_prefixed() {
        let a = compute_mdhash_id("hello", "doc-");
        let b = compute_mdhash_id("hello", "doc-");
        assert_eq!(a, b);
        assert!(a.starts_with("doc-"));
        assert_eq!(a.len(), "doc-".len() + 64);
        assert_ne!(a, compute_mdhash_id("hello!", "doc-"));
    }
}
