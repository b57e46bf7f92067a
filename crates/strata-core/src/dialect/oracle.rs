use super::{Dialect, DialectKind, EnumStyle, Feature, ParameterStyle};
use crate::schema::{Generation, ReferentialAction};

/// Oracle Database. No RESTRICT, no ON UPDATE actions, virtual computed
/// columns only, 30-character identifiers.
pub static ORACLE: Dialect = Dialect {
    kind: DialectKind::Oracle,
    quote: ('"', '"'),
    max_identifier_length: 30,
    features: &[
        Feature::VirtualComputedColumns,
        Feature::Comments,
        Feature::CheckConstraints,
        Feature::DeferrableConstraints,
        Feature::AlterColumn,
        Feature::AlterConstraints,
        Feature::DropPrimaryKey,
        Feature::RenameConstraint,
        Feature::NamedPrimaryKeys,
        Feature::Views,
        Feature::MaterializedViews,
        Feature::CompositeAutoIncrement,
    ],
    generation_strategies: &[Generation::Increment, Generation::Identity],
    delete_actions: &[
        ReferentialAction::NoAction,
        ReferentialAction::Cascade,
        ReferentialAction::SetNull,
    ],
    update_actions: &[ReferentialAction::NoAction],
    type_aliases: &[
        ("varchar", "varchar2"),
        ("character varying", "varchar2"),
        ("nvarchar", "nvarchar2"),
        ("character", "char"),
        ("int", "integer"),
        ("numeric", "number"),
        ("decimal", "number"),
        ("dec", "number"),
        ("double precision", "float"),
        ("text", "clob"),
        ("boolean", "number"),
    ],
    length_types: &["varchar2", "nvarchar2", "char", "nchar", "raw"],
    precision_types: &[
        "number",
        "float",
        "timestamp",
        "timestamp with time zone",
        "timestamp with local time zone",
    ],
    default_lengths: &[
        ("varchar2", "255"),
        ("nvarchar2", "255"),
        ("char", "1"),
        ("nchar", "1"),
        ("raw", "2000"),
    ],
    boolean_literals: ("1", "0"),
    enum_style: EnumStyle::Check,
    enum_fallback: ("varchar2", "255"),
    parameter_style: ParameterStyle::Colon,
    default_schema: None,
    add_column: "ADD",
    alter_requires_index_rebuild: false,
};
