use super::Document;
use crate::DocId;

/// A document on its way to an indexing worker, doc id already assigned.
#[derive(Eq, PartialEq, Debug)]
pub struct AddOperation {
    pub doc_id: DocId,
    pub document: Document,
}
