use super::{Dialect, DialectKind, EnumStyle, Feature, ParameterStyle};
use crate::schema::{Generation, ReferentialAction};

const ACTIONS: &[ReferentialAction] = &[
    ReferentialAction::NoAction,
    ReferentialAction::Cascade,
    ReferentialAction::SetNull,
    ReferentialAction::SetDefault,
];

/// Microsoft SQL Server.
pub static SQL_SERVER: Dialect = Dialect {
    kind: DialectKind::SqlServer,
    quote: ('"', '"'),
    max_identifier_length: 128,
    features: &[
        Feature::PartialIndexes,
        Feature::StoredComputedColumns,
        Feature::VirtualComputedColumns,
        Feature::CheckConstraints,
        Feature::AlterColumn,
        Feature::AlterConstraints,
        Feature::DropPrimaryKey,
        Feature::RenameConstraint,
        Feature::NamedPrimaryKeys,
        Feature::Collations,
        Feature::Views,
        Feature::OnUpdateActions,
        Feature::CompositeAutoIncrement,
    ],
    generation_strategies: &[Generation::Increment, Generation::Uuid, Generation::Identity],
    delete_actions: ACTIONS,
    update_actions: ACTIONS,
    type_aliases: &[
        ("integer", "int"),
        ("character varying", "varchar"),
        ("character", "char"),
        ("national character varying", "nvarchar"),
        ("national character", "nchar"),
        ("double precision", "float"),
        ("boolean", "bit"),
        ("bool", "bit"),
        ("dec", "decimal"),
        ("rowversion", "timestamp"),
    ],
    length_types: &["varchar", "nvarchar", "char", "nchar", "binary", "varbinary"],
    precision_types: &["decimal", "numeric", "datetime2", "datetimeoffset", "time"],
    default_lengths: &[
        ("varchar", "255"),
        ("nvarchar", "255"),
        ("char", "1"),
        ("nchar", "1"),
        ("binary", "1"),
        ("varbinary", "1"),
    ],
    boolean_literals: ("1", "0"),
    enum_style: EnumStyle::Check,
    enum_fallback: ("nvarchar", "255"),
    parameter_style: ParameterStyle::AtP,
    default_schema: Some("dbo"),
    add_column: "ADD",
    alter_requires_index_rebuild: true,
};
