use crate::core::Term;
use crate::DocId;

/// Cursor over the (doc, freq) pairs of one term.
///
/// A cursor starts before its first document: call [`next`](TermDocs::next)
/// or [`skip_to`](TermDocs::skip_to) before reading [`doc`](TermDocs::doc).
pub trait TermDocs {
    /// Position the cursor on `term`. Returns `false` when the term has no postings.
    fn seek(&mut self, term: &Term) -> crate::Result<bool>;

    /// Current document.
    fn doc(&self) -> DocId;

    /// Occurrences of the term in the current document.
    fn freq(&self) -> u32;

    /// Move to the next document, `false` once exhausted.
    fn next(&mut self) -> crate::Result<bool>;

    /// Fill `docs`/`freqs` with the next documents, returns how many were read.
    /// Zero means the postings are exhausted.
    fn read(&mut self, docs: &mut [DocId], freqs: &mut [u32]) -> crate::Result<usize>;

    /// Move to the first document `>= target`, `false` if there is none.
    fn skip_to(&mut self, target: DocId) -> crate::Result<bool>;
}

/// [`TermDocs`] plus the positions (and payloads) inside each document.
pub trait TermPositions: TermDocs {
    /// Next position in the current document. Call at most `freq()` times per document.
    fn next_position(&mut self) -> crate::Result<u32>;

    /// Length of the payload at the current position.
    fn payload_length(&self) -> u32;

    /// Payload at the current position. It may only be read once per position.
    fn payload(&mut self) -> crate::Result<&[u8]>;

    /// Whether the current position has a payload that has not been read yet.
    fn is_payload_available(&self) -> bool;
}
