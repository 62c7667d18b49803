/// What happens when a write collides with an existing row on the entity's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// First write wins: the existing row is kept and the insert is not counted.
    Ignore,
    /// Last write wins: every non-key column is replaced with the incoming value.
    Overwrite,
}

/// Table layout and conflict behaviour of a persisted entity.
///
/// Storage backends derive their upsert semantics from these constants, so the
/// append-only tables and the overwrite-on-conflict tables share one mechanism.
pub trait Persisted {
    const TABLE: &'static str;
    /// Insert columns, in bind order.
    const COLUMNS: &'static [&'static str];
    /// Columns of the uniqueness constraint the upsert targets.
    const CONFLICT_KEY: &'static [&'static str];
    const ON_CONFLICT: ConflictPolicy;

    /// Columns replaced on an `Overwrite` conflict.
    fn update_columns() -> Vec<&'static str> {
        Self::COLUMNS
            .iter()
            .copied()
            .filter(|c| !Self::CONFLICT_KEY.contains(c))
            .collect()
    }
}
