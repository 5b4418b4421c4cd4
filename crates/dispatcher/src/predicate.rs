//! Reusable predicate patterns for processor `matches`
//!
//! Patterns are ANDed by `RecordFilter`:
//! - source scope equality
//! - entity-type tag equality
//! - change kind equality
//! - field-level diff (only for `Updated`)

use contracts::{ChangeKind, ChangeRecord, SourceRecord, StateSide};

/// Scope equality: source name, channel identifier or container name
pub fn source_is(record: &SourceRecord, scope: &str) -> bool {
    record.scope() == scope
}

pub fn entity_type_is(change: &ChangeRecord, entity_type: &str) -> bool {
    change.entity_type() == Some(entity_type)
}

pub fn kind_is(change: &ChangeRecord, kind: ChangeKind) -> bool {
    change.kind == kind
}

/// True only for `Updated` records whose prior and current values of `field`
/// differ. An attribute present on one side only counts as changed.
pub fn field_changed(change: &ChangeRecord, field: &str) -> bool {
    if change.kind != ChangeKind::Updated {
        return false;
    }
    change.attribute(StateSide::Prior, field) != change.attribute(StateSide::Current, field)
}

/// Conjunction of change-record predicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    source_name: Option<String>,
    entity_type: Option<String>,
    kind: Option<ChangeKind>,
    changed_field: Option<String>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn kind(mut self, kind: ChangeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Require a diff on `field` (implies `Updated`)
    pub fn changed_field(mut self, field: impl Into<String>) -> Self {
        self.changed_field = Some(field.into());
        self
    }

    /// Evaluate against any record; non-change records never match
    pub fn matches(&self, record: &SourceRecord) -> bool {
        record
            .as_change()
            .is_some_and(|change| self.matches_change(change))
    }

    pub fn matches_change(&self, change: &ChangeRecord) -> bool {
        self.source_name
            .as_deref()
            .is_none_or(|name| change.source_name == name)
            && self.kind.is_none_or(|kind| kind_is(change, kind))
            && self
                .entity_type
                .as_deref()
                .is_none_or(|ty| entity_type_is(change, ty))
            && self
                .changed_field
                .as_deref()
                .is_none_or(|field| field_changed(change, field))
    }
}
