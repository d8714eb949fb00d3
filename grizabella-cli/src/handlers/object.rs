use grizabella_core::adapters::relational::RelationalFilter;
use grizabella_core::error::Result;

use crate::args::{FindObjectsArgs, GetObjectArgs, UpsertObjectArgs};
use crate::commands::ObjectCommands;
use crate::context::GrizabellaCliContext;
use crate::output::{self, OutputFormat};
use crate::utils::parse_properties;

pub async fn handle(ctx: &GrizabellaCliContext, cmd: ObjectCommands, format: OutputFormat) -> Result<()> {
    match cmd {
        ObjectCommands::Upsert(args) => upsert(ctx, args, format).await,
        ObjectCommands::Get(args) => get(ctx, args, format).await,
        ObjectCommands::Delete(args) => delete(ctx, args, format).await,
        ObjectCommands::Find(args) => find(ctx, args, format).await,
    }
}

async fn upsert(ctx: &GrizabellaCliContext, args: UpsertObjectArgs, format: OutputFormat) -> Result<()> {
    let properties = parse_properties(&args.properties)?;
    let instance = ctx
        .db
        .upsert_object(&args.object_type_name, args.id, properties, args.weight)
        .await?;
    output::print_object(&instance, format);
    Ok(())
}

async fn get(ctx: &GrizabellaCliContext, args: GetObjectArgs, format: OutputFormat) -> Result<()> {
    match ctx.db.get_object_by_id(&args.object_type_name, args.id).await? {
        Some(instance) => output::print_object(&instance, format),
        None => output::output_error(&format!("object '{}' not found", args.id), format),
    }
    Ok(())
}

async fn delete(ctx: &GrizabellaCliContext, args: GetObjectArgs, format: OutputFormat) -> Result<()> {
    ctx.db.delete_object(&args.object_type_name, args.id).await?;
    match format {
        OutputFormat::Json => println!("{{\"deleted\": \"{}\"}}", args.id),
        OutputFormat::Text => println!("{}", output::format_success(&format!("deleted object '{}'", args.id))),
    }
    Ok(())
}

async fn find(ctx: &GrizabellaCliContext, args: FindObjectsArgs, format: OutputFormat) -> Result<()> {
    let mut filters = Vec::with_capacity(args.filters.len());
    for raw in &args.filters {
        let (name, value) = raw.split_once('=').ok_or_else(|| {
            grizabella_core::error::GrizabellaError::Validation(format!("filter '{raw}' must be 'name=value'"))
        })?;
        let parsed = parse_properties(&[format!("{name}={value}")])?;
        let value = parsed.into_values().next().expect("single pair parsed");
        filters.push(RelationalFilter::eq(name, value));
    }
    let found = ctx.db.find_objects(&args.object_type_name, &filters, args.limit).await?;
    output::print_object_list(&found, format);
    Ok(())
}
