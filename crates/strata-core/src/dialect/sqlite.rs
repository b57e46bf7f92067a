use super::{Dialect, DialectKind, EnumStyle, Feature, ParameterStyle};
use crate::schema::{Generation, ReferentialAction};

const ALL_ACTIONS: &[ReferentialAction] = &[
    ReferentialAction::NoAction,
    ReferentialAction::Restrict,
    ReferentialAction::Cascade,
    ReferentialAction::SetNull,
    ReferentialAction::SetDefault,
];

/// SQLite. Declared types round-trip verbatim, so only `int` is folded.
/// Columns and constraints of existing tables change by rebuilding the table.
pub static SQLITE: Dialect = Dialect {
    kind: DialectKind::Sqlite,
    quote: ('"', '"'),
    max_identifier_length: usize::MAX,
    features: &[
        Feature::PartialIndexes,
        Feature::StoredComputedColumns,
        Feature::VirtualComputedColumns,
        Feature::CheckConstraints,
        Feature::DeferrableConstraints,
        Feature::Collations,
        Feature::Views,
        Feature::WithoutRowid,
        Feature::OnUpdateActions,
    ],
    generation_strategies: &[Generation::Increment, Generation::Rowid],
    delete_actions: ALL_ACTIONS,
    update_actions: ALL_ACTIONS,
    type_aliases: &[("int", "integer")],
    length_types: &[
        "character",
        "varchar",
        "varying character",
        "nchar",
        "native character",
        "nvarchar",
        "text",
        "blob",
        "clob",
    ],
    precision_types: &["decimal", "numeric"],
    default_lengths: &[],
    boolean_literals: ("1", "0"),
    enum_style: EnumStyle::Check,
    enum_fallback: ("varchar", "255"),
    parameter_style: ParameterStyle::Question,
    default_schema: None,
    add_column: "ADD COLUMN",
    alter_requires_index_rebuild: false,
};
