//! Top-level command structure: one variant per library API surface group
//! (spec §6).

use clap::Subcommand;

use crate::args::*;

#[derive(Subcommand)]
pub enum Commands {
    /// Object type definitions.
    #[command(subcommand)]
    ObjectType(ObjectTypeCommands),

    /// Relation type definitions.
    #[command(subcommand)]
    RelationType(RelationTypeCommands),

    /// Embedding definitions.
    #[command(subcommand)]
    EmbeddingDefinition(EmbeddingDefinitionCommands),

    /// Object instances.
    #[command(subcommand)]
    Object(ObjectCommands),

    /// Relation instances.
    #[command(subcommand)]
    Relation(RelationCommands),

    /// Complex, similarity, and instance-seeded queries.
    #[command(subcommand)]
    Query(QueryCommands),

    /// Generate shell completion scripts.
    Completions { shell: clap_complete::Shell },
}

#[derive(Subcommand)]
pub enum ObjectTypeCommands {
    Create(CreateObjectTypeArgs),
    Get(NameArg),
    List,
    Delete(NameArg),
}

#[derive(Subcommand)]
pub enum RelationTypeCommands {
    Create(CreateRelationTypeArgs),
    Get(NameArg),
    Delete(NameArg),
}

#[derive(Subcommand)]
pub enum EmbeddingDefinitionCommands {
    Create(CreateEmbeddingDefinitionArgs),
    Get(NameArg),
}

#[derive(Subcommand)]
pub enum ObjectCommands {
    Upsert(UpsertObjectArgs),
    Get(GetObjectArgs),
    Delete(GetObjectArgs),
    Find(FindObjectsArgs),
}

#[derive(Subcommand)]
pub enum RelationCommands {
    Add(AddRelationArgs),
    Update(UpdateRelationArgs),
    Get(GetRelationArgs),
    Delete(GetRelationArgs),
    Outgoing(RelationsByEndpointArgs),
    Incoming(RelationsByEndpointArgs),
}

#[derive(Subcommand)]
pub enum QueryCommands {
    Complex(ComplexQueryArgs),
    Similar(FindSimilarArgs),
    SimilarObjects(SearchSimilarObjectsArgs),
}
