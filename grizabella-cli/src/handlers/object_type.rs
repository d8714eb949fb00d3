use grizabella_core::error::Result;
use grizabella_core::types::ObjectTypeDefinition;

use crate::args::{CreateObjectTypeArgs, NameArg};
use crate::commands::ObjectTypeCommands;
use crate::context::GrizabellaCliContext;
use crate::output::{self, OutputFormat};
use crate::utils::parse_property_spec;

pub async fn handle(ctx: &GrizabellaCliContext, cmd: ObjectTypeCommands, format: OutputFormat) -> Result<()> {
    match cmd {
        ObjectTypeCommands::Create(args) => create(ctx, args, format).await,
        ObjectTypeCommands::Get(args) => get(ctx, args, format).await,
        ObjectTypeCommands::List => list(ctx, format).await,
        ObjectTypeCommands::Delete(args) => delete(ctx, args, format).await,
    }
}

async fn create(ctx: &GrizabellaCliContext, args: CreateObjectTypeArgs, format: OutputFormat) -> Result<()> {
    let properties = args
        .properties
        .iter()
        .map(|spec| parse_property_spec(spec))
        .collect::<Result<Vec<_>>>()?;
    let mut otd = ObjectTypeDefinition::new(args.name, properties);
    otd.description = args.description;
    ctx.db.create_object_type(otd.clone()).await?;
    output::print_object_type(&otd, format);
    Ok(())
}

async fn get(ctx: &GrizabellaCliContext, args: NameArg, format: OutputFormat) -> Result<()> {
    match ctx.db.get_object_type(&args.name).await {
        Some(otd) => output::print_object_type(&otd, format),
        None => output::output_error(&format!("object type '{}' not found", args.name), format),
    }
    Ok(())
}

async fn list(ctx: &GrizabellaCliContext, format: OutputFormat) -> Result<()> {
    let otds = ctx.db.list_object_types().await;
    for otd in &otds {
        output::print_object_type(otd, format);
    }
    Ok(())
}

async fn delete(ctx: &GrizabellaCliContext, args: NameArg, _format: OutputFormat) -> Result<()> {
    ctx.db.delete_object_type(&args.name).await?;
    println!("{}", output::format_success(&format!("deleted object type '{}'", args.name)));
    Ok(())
}
