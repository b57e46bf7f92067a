use super::{Dialect, DialectKind, EnumStyle, Feature, ParameterStyle};
use crate::schema::{Generation, ReferentialAction};

const ALL_ACTIONS: &[ReferentialAction] = &[
    ReferentialAction::NoAction,
    ReferentialAction::Restrict,
    ReferentialAction::Cascade,
    ReferentialAction::SetNull,
    ReferentialAction::SetDefault,
];

/// MySQL and MariaDB. Check constraints are treated as unsupported.
pub static MYSQL: Dialect = Dialect {
    kind: DialectKind::Mysql,
    quote: ('`', '`'),
    max_identifier_length: 64,
    features: &[
        Feature::StoredComputedColumns,
        Feature::VirtualComputedColumns,
        Feature::Comments,
        Feature::AlterColumn,
        Feature::AlterConstraints,
        Feature::DropPrimaryKey,
        Feature::Collations,
        Feature::Views,
        Feature::OnUpdateActions,
        Feature::CompositeAutoIncrement,
    ],
    generation_strategies: &[Generation::Increment, Generation::Uuid],
    delete_actions: ALL_ACTIONS,
    update_actions: ALL_ACTIONS,
    type_aliases: &[
        ("integer", "int"),
        ("int4", "int"),
        ("int8", "bigint"),
        ("int2", "smallint"),
        ("bool", "tinyint"),
        ("boolean", "tinyint"),
        ("dec", "decimal"),
        ("numeric", "decimal"),
        ("fixed", "decimal"),
        ("double precision", "double"),
        ("real", "double"),
        ("character varying", "varchar"),
        ("character", "char"),
    ],
    length_types: &["varchar", "char", "binary", "varbinary", "bit"],
    precision_types: &["decimal", "float", "double", "datetime", "timestamp", "time"],
    default_lengths: &[
        ("varchar", "255"),
        ("char", "1"),
        ("binary", "1"),
        ("varbinary", "255"),
    ],
    boolean_literals: ("1", "0"),
    enum_style: EnumStyle::Inline,
    enum_fallback: ("varchar", "255"),
    parameter_style: ParameterStyle::Question,
    default_schema: None,
    add_column: "ADD",
    alter_requires_index_rebuild: false,
};
