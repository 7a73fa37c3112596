use std::slice;

/// Enum describing each component of a segment.
/// Each component is stored in its own file, named `<segment_name>.<extension>`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SegmentComponent {
    /// 段的元数据 (json)
    Meta,
    FieldInfos,
    /// Term dictionary.
    TermInfos,
    /// Sampled index over the term dictionary.
    TermIndex,
    /// Doc stream and skip data.
    Freq,
    /// Positions and payloads, only present when some field keeps positions.
    Prox,
    /// 被删除的 doc id (roaring bitmap)
    Deletes,
}

impl SegmentComponent {
    /// Iterates through the components.
    pub fn iterator() -> slice::Iter<'static, SegmentComponent> {
        static SEGMENT_COMPONENTS: [SegmentComponent; 7] = [
            SegmentComponent::Meta,
            SegmentComponent::FieldInfos,
            SegmentComponent::TermInfos,
            SegmentComponent::TermIndex,
            SegmentComponent::Freq,
            SegmentComponent::Prox,
            SegmentComponent::Deletes,
        ];
        SEGMENT_COMPONENTS.iter()
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SegmentComponent::Meta => "si",
            SegmentComponent::FieldInfos => "fnm",
            SegmentComponent::TermInfos => "tis",
            SegmentComponent::TermIndex => "tii",
            SegmentComponent::Freq => "frq",
            SegmentComponent::Prox => "prx",
            SegmentComponent::Deletes => "del",
        }
    }

    pub fn file_name(&self, segment_name: &str) -> String {
        format!("{}.{}", segment_name, self.extension())
    }
}
