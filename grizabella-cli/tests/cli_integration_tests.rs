//! Integration tests exercising the CLI's context and handlers against a
//! temp-directory database (no subprocess spawn, matching the teacher's own
//! in-process CLI test style).

use grizabella_cli::args::{CreateObjectTypeArgs, GetObjectArgs, NameArg, UpsertObjectArgs};
use grizabella_cli::commands::{ObjectCommands, ObjectTypeCommands};
use grizabella_cli::context::GrizabellaCliContext;
use grizabella_cli::handlers;
use grizabella_cli::output::OutputFormat;

async fn test_context() -> (GrizabellaCliContext, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let ctx = GrizabellaCliContext::new(Some(dir.path().join("kb").to_string_lossy().to_string()))
        .await
        .unwrap();
    (ctx, dir)
}

#[tokio::test]
async fn create_object_type_then_upsert_and_get_roundtrips() {
    let (ctx, _dir) = test_context().await;

    let create = ObjectTypeCommands::Create(CreateObjectTypeArgs {
        name: "Book".into(),
        properties: vec!["title:text".into()],
        description: None,
    });
    handlers::object_type::handle(&ctx, create, OutputFormat::Json).await.unwrap();

    let upsert = ObjectCommands::Upsert(UpsertObjectArgs {
        object_type_name: "Book".into(),
        id: None,
        properties: vec!["title=1984".into()],
        weight: None,
    });
    handlers::object::handle(&ctx, upsert, OutputFormat::Json).await.unwrap();

    let found = ctx.db.find_objects("Book", &[], None).await.unwrap();
    assert_eq!(found.len(), 1);

    let get = ObjectCommands::Get(GetObjectArgs { object_type_name: "Book".into(), id: found[0].id() });
    handlers::object::handle(&ctx, get, OutputFormat::Json).await.unwrap();

    ctx.close().await;
}

#[tokio::test]
async fn getting_unknown_object_type_does_not_error() {
    let (ctx, _dir) = test_context().await;
    let get = ObjectTypeCommands::Get(NameArg { name: "Nonexistent".into() });
    handlers::object_type::handle(&ctx, get, OutputFormat::Json).await.unwrap();
    ctx.close().await;
}
