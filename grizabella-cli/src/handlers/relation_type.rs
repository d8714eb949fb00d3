use grizabella_core::error::Result;
use grizabella_core::types::RelationTypeDefinition;

use crate::args::{CreateRelationTypeArgs, NameArg};
use crate::commands::RelationTypeCommands;
use crate::context::GrizabellaCliContext;
use crate::output::{self, OutputFormat};
use crate::utils::parse_property_spec;

pub async fn handle(ctx: &GrizabellaCliContext, cmd: RelationTypeCommands, format: OutputFormat) -> Result<()> {
    match cmd {
        RelationTypeCommands::Create(args) => create(ctx, args, format).await,
        RelationTypeCommands::Get(args) => get(ctx, args, format).await,
        RelationTypeCommands::Delete(args) => delete(ctx, args).await,
    }
}

async fn create(ctx: &GrizabellaCliContext, args: CreateRelationTypeArgs, format: OutputFormat) -> Result<()> {
    let properties = args
        .properties
        .iter()
        .map(|spec| parse_property_spec(spec))
        .collect::<Result<Vec<_>>>()?;
    let mut rtd = RelationTypeDefinition::new(args.name, args.source_otds, args.target_otds);
    rtd.properties = properties;
    rtd.description = args.description;
    ctx.db.create_relation_type(rtd.clone()).await?;
    output::print_relation_type(&rtd, format);
    Ok(())
}

async fn get(ctx: &GrizabellaCliContext, args: NameArg, format: OutputFormat) -> Result<()> {
    match ctx.db.get_relation_type(&args.name).await {
        Some(rtd) => output::print_relation_type(&rtd, format),
        None => output::output_error(&format!("relation type '{}' not found", args.name), format),
    }
    Ok(())
}

async fn delete(ctx: &GrizabellaCliContext, args: NameArg) -> Result<()> {
    ctx.db.delete_relation_type(&args.name).await?;
    println!("{}", output::format_success(&format!("deleted relation type '{}'", args.name)));
    Ok(())
}
