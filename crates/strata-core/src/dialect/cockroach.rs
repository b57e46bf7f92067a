use super::{Dialect, DialectKind, EnumStyle, Feature, ParameterStyle};
use crate::schema::{Generation, ReferentialAction};

const ALL_ACTIONS: &[ReferentialAction] = &[
    ReferentialAction::NoAction,
    ReferentialAction::Restrict,
    ReferentialAction::Cascade,
    ReferentialAction::SetNull,
    ReferentialAction::SetDefault,
];

/// CockroachDB. Postgres-flavoured, but without exclusion constraints,
/// deferrable constraints, or primary-key drops.
pub static COCKROACH: Dialect = Dialect {
    kind: DialectKind::Cockroach,
    quote: ('"', '"'),
    max_identifier_length: 63,
    features: &[
        Feature::PartialIndexes,
        Feature::IndexMethods,
        Feature::StoredComputedColumns,
        Feature::VirtualComputedColumns,
        Feature::Comments,
        Feature::CheckConstraints,
        Feature::AlterColumn,
        Feature::AlterConstraints,
        Feature::RenameConstraint,
        Feature::NamedPrimaryKeys,
        Feature::Collations,
        Feature::Views,
        Feature::MaterializedViews,
        Feature::OnUpdateActions,
        Feature::CompositeAutoIncrement,
    ],
    generation_strategies: &[Generation::Increment, Generation::Uuid, Generation::Rowid],
    delete_actions: ALL_ACTIONS,
    update_actions: ALL_ACTIONS,
    type_aliases: &[
        ("int", "int8"),
        ("integer", "int8"),
        ("int64", "int8"),
        ("bigint", "int8"),
        ("serial", "int8"),
        ("int4", "int4"),
        ("smallint", "int2"),
        ("int16", "int2"),
        ("float", "float8"),
        ("double precision", "float8"),
        ("real", "float4"),
        ("boolean", "bool"),
        ("character varying", "varchar"),
        ("character", "char"),
        ("text", "string"),
        ("numeric", "decimal"),
        ("dec", "decimal"),
        ("timestamp without time zone", "timestamp"),
        ("timestamp with time zone", "timestamptz"),
        ("bit varying", "varbit"),
        ("bytea", "bytes"),
    ],
    length_types: &["varchar", "char", "string", "bit", "varbit"],
    precision_types: &["decimal", "timestamp", "timestamptz", "time", "timetz", "interval"],
    default_lengths: &[("char", "1"), ("bit", "1")],
    boolean_literals: ("true", "false"),
    enum_style: EnumStyle::NamedType,
    enum_fallback: ("varchar", "255"),
    parameter_style: ParameterStyle::Dollar,
    default_schema: Some("public"),
    add_column: "ADD",
    alter_requires_index_rebuild: false,
};
