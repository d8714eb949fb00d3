use grizabella_core::error::Result;

use crate::args::{ComplexQueryArgs, FindSimilarArgs, SearchSimilarObjectsArgs};
use crate::commands::QueryCommands;
use crate::context::GrizabellaCliContext;
use crate::output::{self, OutputFormat};
use crate::query_dto::parse_complex_query;

pub async fn handle(ctx: &GrizabellaCliContext, cmd: QueryCommands, format: OutputFormat) -> Result<()> {
    match cmd {
        QueryCommands::Complex(args) => complex(ctx, args, format).await,
        QueryCommands::Similar(args) => similar(ctx, args, format).await,
        QueryCommands::SimilarObjects(args) => similar_objects(ctx, args, format).await,
    }
}

async fn complex(ctx: &GrizabellaCliContext, args: ComplexQueryArgs, format: OutputFormat) -> Result<()> {
    let query = parse_complex_query(&args.query_json)?;
    let result = ctx.db.execute_complex_query(query).await?;
    output::print_query_result(&result, format);
    Ok(())
}

async fn similar(ctx: &GrizabellaCliContext, args: FindSimilarArgs, format: OutputFormat) -> Result<()> {
    let hits = ctx.db.find_similar(&args.ed_name, &args.query_text, args.limit).await?;
    print_hits(&hits, format);
    Ok(())
}

async fn similar_objects(ctx: &GrizabellaCliContext, args: SearchSimilarObjectsArgs, format: OutputFormat) -> Result<()> {
    let hits = ctx
        .db
        .search_similar_objects(args.object_id, &args.ed_name, args.n_results, None)
        .await?;
    print_hits(&hits, format);
    Ok(())
}

fn print_hits(hits: &[grizabella_core::adapters::vector::VectorHit], format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&hits_json(hits)).unwrap_or_default()),
        OutputFormat::Text => {
            for hit in hits {
                println!(
                    "{} {} distance={:.4} preview={:?}",
                    output::format_info("hit"),
                    hit.object_instance_id,
                    hit.distance,
                    hit.preview
                );
            }
        }
    }
}

fn hits_json(hits: &[grizabella_core::adapters::vector::VectorHit]) -> serde_json::Value {
    serde_json::json!(hits
        .iter()
        .map(|h| serde_json::json!({
            "object_instance_id": h.object_instance_id,
            "distance": h.distance,
            "preview": h.preview,
        }))
        .collect::<Vec<_>>())
}
