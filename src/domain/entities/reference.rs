/// Immutable provider records cached locally and looked up by a grouping key.
pub trait ReferenceEntity: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;

    /// Key the lookup table is indexed by.
    fn grouping_key(&self) -> &str;
}
