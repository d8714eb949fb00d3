//! CLI argument structures, grouped by the schema/instance/query surface
//! each subcommand exercises (spec §6).

use clap::Args;
use uuid::Uuid;

// ---- Object types -------------------------------------------------------

#[derive(Args)]
pub struct CreateObjectTypeArgs {
    /// Object type name, e.g. "Book".
    pub name: String,

    /// Property spec "name:type" (type one of text/integer/float/boolean/
    /// datetime/blob/json/uuid); repeat for multiple properties.
    #[arg(long = "property", short = 'p')]
    pub properties: Vec<String>,

    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args)]
pub struct NameArg {
    pub name: String,
}

// ---- Relation types ------------------------------------------------------

#[derive(Args)]
pub struct CreateRelationTypeArgs {
    pub name: String,

    /// Source object type name; repeat for multiple source types.
    #[arg(long = "source")]
    pub source_otds: Vec<String>,

    /// Target object type name; repeat for multiple target types.
    #[arg(long = "target")]
    pub target_otds: Vec<String>,

    #[arg(long = "property", short = 'p')]
    pub properties: Vec<String>,

    #[arg(long)]
    pub description: Option<String>,
}

// ---- Embedding definitions ------------------------------------------------

#[derive(Args)]
pub struct CreateEmbeddingDefinitionArgs {
    pub name: String,

    #[arg(long = "on")]
    pub object_type_name: String,

    #[arg(long = "source-property")]
    pub source_property_name: String,

    #[arg(long = "model", default_value = "stub-embedding")]
    pub embedding_model: String,

    #[arg(long)]
    pub dimensions: usize,

    #[arg(long)]
    pub description: Option<String>,
}

// ---- Objects --------------------------------------------------------------

#[derive(Args)]
pub struct UpsertObjectArgs {
    #[arg(long = "type", short = 't')]
    pub object_type_name: String,

    #[arg(long)]
    pub id: Option<Uuid>,

    /// Property value "name=value"; repeat for multiple properties. Use
    /// "name:json=<payload>" to force JSON parsing.
    #[arg(long = "set", short = 's')]
    pub properties: Vec<String>,

    #[arg(long)]
    pub weight: Option<f64>,
}

#[derive(Args)]
pub struct GetObjectArgs {
    #[arg(long = "type", short = 't')]
    pub object_type_name: String,

    pub id: Uuid,
}

#[derive(Args)]
pub struct FindObjectsArgs {
    #[arg(long = "type", short = 't')]
    pub object_type_name: String,

    /// Equality filter "name=value"; repeat for multiple filters.
    #[arg(long = "filter", short = 'f')]
    pub filters: Vec<String>,

    #[arg(long)]
    pub limit: Option<usize>,
}

// ---- Relations --------------------------------------------------------------

#[derive(Args)]
pub struct AddRelationArgs {
    #[arg(long = "type", short = 't')]
    pub relation_type_name: String,

    #[arg(long)]
    pub source: Uuid,

    #[arg(long)]
    pub target: Uuid,

    #[arg(long = "set", short = 's')]
    pub properties: Vec<String>,

    #[arg(long)]
    pub weight: Option<f64>,
}

#[derive(Args)]
pub struct UpdateRelationArgs {
    #[arg(long = "type", short = 't')]
    pub relation_type_name: String,

    pub id: Uuid,

    #[arg(long = "set", short = 's')]
    pub properties: Vec<String>,

    #[arg(long)]
    pub weight: Option<f64>,
}

#[derive(Args)]
pub struct GetRelationArgs {
    #[arg(long = "type", short = 't')]
    pub relation_type_name: String,

    pub id: Uuid,
}

#[derive(Args)]
pub struct RelationsByEndpointArgs {
    #[arg(long = "type", short = 't')]
    pub relation_type_name: String,

    pub object_id: Uuid,

    #[arg(long)]
    pub limit: Option<usize>,
}

// ---- Query ------------------------------------------------------------------

#[derive(Args)]
pub struct FindSimilarArgs {
    #[arg(long = "ed")]
    pub ed_name: String,

    pub query_text: String,

    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Args)]
pub struct SearchSimilarObjectsArgs {
    #[arg(long = "ed")]
    pub ed_name: String,

    pub object_id: Uuid,

    #[arg(long = "n", default_value_t = 10)]
    pub n_results: usize,
}

#[derive(Args)]
pub struct ComplexQueryArgs {
    /// JSON-encoded `ComplexQuery` body, with either `components` (implicit
    /// AND) or a `query_root` clause tree. See `grizabella-server`'s
    /// `/query/complex` DTO for the accepted shape.
    pub query_json: String,
}
