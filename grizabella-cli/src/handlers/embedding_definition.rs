use grizabella_core::error::Result;
use grizabella_core::types::EmbeddingDefinition;

use crate::args::{CreateEmbeddingDefinitionArgs, NameArg};
use crate::commands::EmbeddingDefinitionCommands;
use crate::context::GrizabellaCliContext;
use crate::output::{self, OutputFormat};

pub async fn handle(ctx: &GrizabellaCliContext, cmd: EmbeddingDefinitionCommands, format: OutputFormat) -> Result<()> {
    match cmd {
        EmbeddingDefinitionCommands::Create(args) => create(ctx, args, format).await,
        EmbeddingDefinitionCommands::Get(args) => get(ctx, args, format).await,
    }
}

async fn create(ctx: &GrizabellaCliContext, args: CreateEmbeddingDefinitionArgs, format: OutputFormat) -> Result<()> {
    let mut ed = EmbeddingDefinition::new(
        args.name,
        args.object_type_name,
        args.source_property_name,
        args.embedding_model,
        args.dimensions,
    );
    ed.description = args.description;
    ctx.db.create_embedding_definition(ed.clone()).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ed).unwrap_or_default()),
        OutputFormat::Text => println!(
            "{} {} on {}.{} (dim={})",
            output::format_info("embedding definition:"),
            ed.name,
            ed.object_type_name,
            ed.source_property_name,
            ed.dimensions
        ),
    }
    Ok(())
}

async fn get(ctx: &GrizabellaCliContext, args: NameArg, format: OutputFormat) -> Result<()> {
    match ctx.db.get_embedding_definition(&args.name).await {
        Some(ed) => match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ed).unwrap_or_default()),
            OutputFormat::Text => println!("{:#?}", ed),
        },
        None => output::output_error(&format!("embedding definition '{}' not found", args.name), format),
    }
    Ok(())
}
