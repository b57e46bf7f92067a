use super::{Dialect, DialectKind, EnumStyle, Feature, ParameterStyle};
use crate::schema::{Generation, ReferentialAction};

/// Google Cloud Spanner (GoogleSQL dialect).
pub static SPANNER: Dialect = Dialect {
    kind: DialectKind::Spanner,
    quote: ('`', '`'),
    max_identifier_length: 128,
    features: &[
        Feature::StoredComputedColumns,
        Feature::CheckConstraints,
        Feature::AlterColumn,
        Feature::AlterConstraints,
        Feature::Views,
    ],
    generation_strategies: &[Generation::Uuid],
    delete_actions: &[ReferentialAction::NoAction, ReferentialAction::Cascade],
    update_actions: &[ReferentialAction::NoAction],
    type_aliases: &[
        ("int", "int64"),
        ("integer", "int64"),
        ("bigint", "int64"),
        ("smallint", "int64"),
        ("varchar", "string"),
        ("text", "string"),
        ("character varying", "string"),
        ("boolean", "bool"),
        ("double", "float64"),
        ("float", "float64"),
        ("double precision", "float64"),
        ("decimal", "numeric"),
        ("bytea", "bytes"),
        ("blob", "bytes"),
    ],
    length_types: &["string", "bytes"],
    precision_types: &[],
    default_lengths: &[("string", "MAX"), ("bytes", "MAX")],
    boolean_literals: ("true", "false"),
    enum_style: EnumStyle::Check,
    enum_fallback: ("string", "255"),
    parameter_style: ParameterStyle::AtP,
    default_schema: None,
    add_column: "ADD COLUMN",
    alter_requires_index_rebuild: false,
};
