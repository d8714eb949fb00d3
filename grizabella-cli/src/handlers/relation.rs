use grizabella_core::error::Result;

use crate::args::{AddRelationArgs, GetRelationArgs, RelationsByEndpointArgs, UpdateRelationArgs};
use crate::commands::RelationCommands;
use crate::context::GrizabellaCliContext;
use crate::output::{self, OutputFormat};
use crate::utils::parse_properties;

pub async fn handle(ctx: &GrizabellaCliContext, cmd: RelationCommands, format: OutputFormat) -> Result<()> {
    match cmd {
        RelationCommands::Add(args) => add(ctx, args, format).await,
        RelationCommands::Update(args) => update(ctx, args, format).await,
        RelationCommands::Get(args) => get(ctx, args, format).await,
        RelationCommands::Delete(args) => delete(ctx, args, format).await,
        RelationCommands::Outgoing(args) => outgoing(ctx, args, format).await,
        RelationCommands::Incoming(args) => incoming(ctx, args, format).await,
    }
}

async fn add(ctx: &GrizabellaCliContext, args: AddRelationArgs, format: OutputFormat) -> Result<()> {
    let properties = parse_properties(&args.properties)?;
    let relation = ctx
        .db
        .add_relation(&args.relation_type_name, args.source, args.target, properties, args.weight)
        .await?;
    output::print_relation(&relation, format);
    Ok(())
}

async fn update(ctx: &GrizabellaCliContext, args: UpdateRelationArgs, format: OutputFormat) -> Result<()> {
    let properties = parse_properties(&args.properties)?;
    let relation = ctx.db.update_relation(&args.relation_type_name, args.id, properties, args.weight).await?;
    output::print_relation(&relation, format);
    Ok(())
}

async fn get(ctx: &GrizabellaCliContext, args: GetRelationArgs, format: OutputFormat) -> Result<()> {
    match ctx.db.get_relation(&args.relation_type_name, args.id).await? {
        Some(relation) => output::print_relation(&relation, format),
        None => output::output_error(&format!("relation '{}' not found", args.id), format),
    }
    Ok(())
}

async fn delete(ctx: &GrizabellaCliContext, args: GetRelationArgs, format: OutputFormat) -> Result<()> {
    let deleted = ctx.db.delete_relation(&args.relation_type_name, args.id).await?;
    if deleted {
        println!("{}", output::format_success(&format!("deleted relation '{}'", args.id)));
    } else {
        output::output_error(&format!("relation '{}' not found", args.id), format);
    }
    Ok(())
}

async fn outgoing(ctx: &GrizabellaCliContext, args: RelationsByEndpointArgs, format: OutputFormat) -> Result<()> {
    let relations = ctx
        .db
        .get_outgoing_relations(&args.relation_type_name, args.object_id, args.limit)
        .await?;
    output::print_relation_list(&relations, format);
    Ok(())
}

async fn incoming(ctx: &GrizabellaCliContext, args: RelationsByEndpointArgs, format: OutputFormat) -> Result<()> {
    let relations = ctx
        .db
        .get_incoming_relations(&args.relation_type_name, args.object_id, args.limit)
        .await?;
    output::print_relation_list(&relations, format);
    Ok(())
}
