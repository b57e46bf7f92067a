use super::{Dialect, DialectKind, EnumStyle, Feature, ParameterStyle};
use crate::schema::{Generation, ReferentialAction};

const ALL_ACTIONS: &[ReferentialAction] = &[
    ReferentialAction::NoAction,
    ReferentialAction::Restrict,
    ReferentialAction::Cascade,
    ReferentialAction::SetNull,
    ReferentialAction::SetDefault,
];

/// PostgreSQL.
pub static POSTGRES: Dialect = Dialect {
    kind: DialectKind::Postgres,
    quote: ('"', '"'),
    max_identifier_length: 63,
    features: &[
        Feature::ExclusionConstraints,
        Feature::PartialIndexes,
        Feature::IndexMethods,
        Feature::StoredComputedColumns,
        Feature::Comments,
        Feature::CheckConstraints,
        Feature::DeferrableConstraints,
        Feature::AlterColumn,
        Feature::AlterConstraints,
        Feature::DropPrimaryKey,
        Feature::RenameConstraint,
        Feature::NamedPrimaryKeys,
        Feature::Collations,
        Feature::Views,
        Feature::MaterializedViews,
        Feature::OnUpdateActions,
        Feature::CompositeAutoIncrement,
    ],
    generation_strategies: &[Generation::Increment, Generation::Uuid, Generation::Identity],
    delete_actions: ALL_ACTIONS,
    update_actions: ALL_ACTIONS,
    type_aliases: &[
        ("int", "integer"),
        ("int4", "integer"),
        ("serial", "integer"),
        ("serial4", "integer"),
        ("int2", "smallint"),
        ("smallserial", "smallint"),
        ("serial2", "smallint"),
        ("int8", "bigint"),
        ("bigserial", "bigint"),
        ("serial8", "bigint"),
        ("float4", "real"),
        ("float8", "double precision"),
        ("double", "double precision"),
        ("float", "double precision"),
        ("bool", "boolean"),
        ("varchar", "character varying"),
        ("char", "character"),
        ("bpchar", "character"),
        ("decimal", "numeric"),
        ("dec", "numeric"),
        ("timestamp", "timestamp without time zone"),
        ("timestamptz", "timestamp with time zone"),
        ("time", "time without time zone"),
        ("timetz", "time with time zone"),
        ("varbit", "bit varying"),
    ],
    length_types: &["character varying", "character", "bit", "bit varying"],
    precision_types: &[
        "numeric",
        "timestamp without time zone",
        "timestamp with time zone",
        "time without time zone",
        "time with time zone",
        "interval",
    ],
    default_lengths: &[("character", "1"), ("bit", "1")],
    boolean_literals: ("true", "false"),
    enum_style: EnumStyle::NamedType,
    enum_fallback: ("character varying", "255"),
    parameter_style: ParameterStyle::Dollar,
    default_schema: Some("public"),
    add_column: "ADD",
    alter_requires_index_rebuild: false,
};
