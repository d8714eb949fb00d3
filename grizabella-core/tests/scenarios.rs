//! Cross-component end-to-end scenarios (spec.md §8, literal scenarios 1-6).
//!
//! Each test below exercises the full tri-store write path and query surface
//! through the public API, mirroring one of the six literal scenarios in the
//! specification. Scenarios 2 and 3 need a controlled, fully-deterministic
//! embedding model (the default `StubEmbeddingModel` makes no semantic
//! clustering promises), so they register a small fixture model that maps
//! known source texts to hand-picked vectors.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use grizabella_core::adapters::embedding::{EmbeddingModel, EmbeddingModelCache};
use grizabella_core::adapters::relational::RelationalFilter;
use grizabella_core::adapters::{GraphAdapter, RelationalAdapter, VectorAdapter};
use grizabella_core::config::PoolConfig;
use grizabella_core::db_manager::GrizabellaDb;
use grizabella_core::db_manager_factory::DbManagerFactory;
use grizabella_core::error::Result;
use grizabella_core::instance_manager::InstanceManager;
use grizabella_core::pool::ThreadSafeGraphHandle;
use grizabella_core::query::{Clause, ComplexQuery, EmbeddingSearchClause, LogicalOperator, QueryComponent, QueryExecutor, QueryPlanner};
use grizabella_core::schema_manager::SchemaManager;
use grizabella_core::types::{EmbeddingDefinition, ObjectTypeDefinition, Property, PropertyDataType, PropertyValue, RelationTypeDefinition};

/// Maps known source texts to hand-picked vectors so similarity ranking is
/// computable by hand rather than relying on the stub model's hash-based
/// pseudo-embedding, which makes no clustering guarantees.
struct FixtureEmbeddingModel {
    model_id: String,
    dimensions: usize,
    vectors: HashMap<String, Vec<f32>>,
}

#[async_trait]
impl EmbeddingModel for FixtureEmbeddingModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectors.get(text).cloned().unwrap_or_else(|| vec![0.0; self.dimensions]))
    }
}

struct Stack {
    relational: Arc<RelationalAdapter>,
    graph: Arc<GraphAdapter>,
    vector: Arc<VectorAdapter>,
    schema: Arc<SchemaManager>,
    instances: InstanceManager,
    planner: QueryPlanner,
    executor: QueryExecutor,
    _dir: tempfile::TempDir,
}

async fn build_stack(model_cache: EmbeddingModelCache) -> Stack {
    let dir = tempfile::tempdir().unwrap();
    let relational = Arc::new(RelationalAdapter::open(&dir.path().join("sqlite.db"), &PoolConfig::default()).await.unwrap());
    let graph_dir = dir.path().join("kuzu_data");
    std::fs::create_dir_all(&graph_dir).unwrap();
    let graph = Arc::new(GraphAdapter::new(ThreadSafeGraphHandle::open(&graph_dir).unwrap()));
    let vector = Arc::new(VectorAdapter::open(&dir.path().join("lancedb_data"), model_cache).await.unwrap());
    let schema = Arc::new(SchemaManager::load(relational.clone(), graph.clone(), vector.clone()).await.unwrap());
    let instances = InstanceManager::new(relational.clone(), graph.clone(), vector.clone(), schema.clone());
    let planner = QueryPlanner::new(schema.clone());
    let executor = QueryExecutor::new(relational.clone(), graph.clone(), vector.clone(), schema.clone());
    Stack { relational, graph, vector, schema, instances, planner, executor, _dir: dir }
}

/// Scenario 1: `Author`/`Book`/`WRITTEN_BY`, `find_objects(Book)` returns
/// exactly the three books, and incoming `WRITTEN_BY` to Orwell resolves to
/// the two books he wrote.
#[tokio::test]
async fn scenario_1_authors_books_and_written_by() {
    let dir = tempfile::tempdir().unwrap();
    let db = GrizabellaDb::connect(dir.path().join("library").to_str().unwrap(), true).await.unwrap();

    db.create_object_type(ObjectTypeDefinition::new(
        "Author",
        vec![Property::new("name", PropertyDataType::Text), Property::new("birth_year", PropertyDataType::Integer).nullable()],
    ))
    .await
    .unwrap();
    db.create_object_type(ObjectTypeDefinition::new(
        "Book",
        vec![
            Property::new("title", PropertyDataType::Text).unique().indexed(),
            Property::new("isbn", PropertyDataType::Text).unique(),
        ],
    ))
    .await
    .unwrap();
    db.create_relation_type(RelationTypeDefinition::new("WRITTEN_BY", vec!["Book".to_string()], vec!["Author".to_string()]))
        .await
        .unwrap();

    let mut orwell_props = HashMap::new();
    orwell_props.insert("name".to_string(), PropertyValue::Text("George Orwell".to_string()));
    orwell_props.insert("birth_year".to_string(), PropertyValue::Integer(1903));
    let orwell = db.upsert_object("Author", None, orwell_props, None).await.unwrap();

    let mut huxley_props = HashMap::new();
    huxley_props.insert("name".to_string(), PropertyValue::Text("Aldous Huxley".to_string()));
    let huxley = db.upsert_object("Author", None, huxley_props, None).await.unwrap();

    let mut props_1984 = HashMap::new();
    props_1984.insert("title".to_string(), PropertyValue::Text("1984".to_string()));
    props_1984.insert("isbn".to_string(), PropertyValue::Text("isbn-1984".to_string()));
    let book_1984 = db.upsert_object("Book", None, props_1984, None).await.unwrap();

    let mut props_animal_farm = HashMap::new();
    props_animal_farm.insert("title".to_string(), PropertyValue::Text("Animal Farm".to_string()));
    props_animal_farm.insert("isbn".to_string(), PropertyValue::Text("isbn-animal-farm".to_string()));
    let animal_farm = db.upsert_object("Book", None, props_animal_farm, None).await.unwrap();

    let mut props_bnw = HashMap::new();
    props_bnw.insert("title".to_string(), PropertyValue::Text("Brave New World".to_string()));
    props_bnw.insert("isbn".to_string(), PropertyValue::Text("isbn-bnw".to_string()));
    let bnw = db.upsert_object("Book", None, props_bnw, None).await.unwrap();

    db.add_relation("WRITTEN_BY", book_1984.id(), orwell.id(), HashMap::new(), None).await.unwrap();
    db.add_relation("WRITTEN_BY", animal_farm.id(), orwell.id(), HashMap::new(), None).await.unwrap();
    db.add_relation("WRITTEN_BY", bnw.id(), huxley.id(), HashMap::new(), None).await.unwrap();

    let books = db.find_objects("Book", &[], None).await.unwrap();
    let book_ids: HashSet<Uuid> = books.iter().map(|o| o.id()).collect();
    assert_eq!(book_ids.len(), 3);
    assert!(book_ids.contains(&book_1984.id()));
    assert!(book_ids.contains(&animal_farm.id()));
    assert!(book_ids.contains(&bnw.id()));

    let incoming_to_orwell = db.get_incoming_relations("WRITTEN_BY", orwell.id(), None).await.unwrap();
    assert_eq!(incoming_to_orwell.len(), 2);
    let sources: HashSet<Uuid> = incoming_to_orwell.iter().map(|r| r.source_object_id).collect();
    assert!(sources.contains(&book_1984.id()));
    assert!(sources.contains(&animal_farm.id()));

    db.close().await;
}

/// Shared fixture for scenarios 2 and 3: five papers whose summaries embed
/// into a hand-picked 4-dimensional space with a tight AI-ethics cluster near
/// `[1, 0, 0, 0]`, a quantum paper near `[0, 1, 0, 0]`, and a bio paper near
/// `[0, 0, 1, 0]`.
fn paper_fixture_model() -> Arc<FixtureEmbeddingModel> {
    let mut vectors = HashMap::new();
    vectors.insert("AI ethics and fairness in algorithms".to_string(), vec![1.0, 0.0, 0.0, 0.0]);
    vectors.insert("algorithmic bias and fairness in AI systems".to_string(), vec![0.9, 0.1, 0.0, 0.0]);
    vectors.insert("ethics of artificial intelligence decision making".to_string(), vec![0.95, 0.05, 0.0, 0.0]);
    vectors.insert("quantum entanglement and computing".to_string(), vec![0.0, 1.0, 0.0, 0.0]);
    vectors.insert("bioinformatics and gene sequencing".to_string(), vec![0.0, 0.0, 1.0, 0.0]);
    vectors.insert("fairness in AI".to_string(), vec![1.0, 0.0, 0.0, 0.0]);
    Arc::new(FixtureEmbeddingModel { model_id: "fixture-embed".to_string(), dimensions: 4, vectors })
}

/// Scenario 2: an embedding definition over `Paper.summary`; a free-text
/// similarity search for "fairness in AI" returns the 3 AI-ethics papers in
/// ascending distance.
#[tokio::test]
async fn scenario_2_similarity_search_returns_cluster_in_ascending_distance() {
    let model_cache = EmbeddingModelCache::new();
    model_cache.register(paper_fixture_model()).await;
    let stack = build_stack(model_cache).await;

    stack
        .schema
        .create_object_type(ObjectTypeDefinition::new("Paper", vec![Property::new("summary", PropertyDataType::Text)]))
        .await
        .unwrap();
    stack
        .schema
        .create_embedding_definition(EmbeddingDefinition::new("paper_summary_embedding", "Paper", "summary", "fixture-embed", 4))
        .await
        .unwrap();

    let mut ids = Vec::new();
    for summary in [
        "AI ethics and fairness in algorithms",
        "algorithmic bias and fairness in AI systems",
        "ethics of artificial intelligence decision making",
        "quantum entanglement and computing",
        "bioinformatics and gene sequencing",
    ] {
        let mut props = HashMap::new();
        props.insert("summary".to_string(), PropertyValue::Text(summary.to_string()));
        let obj = stack.instances.upsert_object("Paper", None, props, None).await.unwrap();
        ids.push(obj.id());
    }
    let [ai_1, ai_2, ai_3, _quantum, _bio] = [ids[0], ids[1], ids[2], ids[3], ids[4]];

    let model = stack.vector.get_embedding_model("fixture-embed").await.unwrap();
    let query_vector = model.embed("fairness in AI").await.unwrap();
    let hits = stack.vector.query_similar("paper_summary_embedding", &query_vector, 3, None).await.unwrap();

    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].object_instance_id, ai_1);
    assert_eq!(hits[1].object_instance_id, ai_3);
    assert_eq!(hits[2].object_instance_id, ai_2);
    assert!(hits[0].distance <= hits[1].distance);
    assert!(hits[1].distance <= hits[2].distance);
}

/// Scenario 3: `AND(QC(Researcher, specialty=="AI Ethics"), QC(Paper,
/// embedding_search(...)))` returns only researchers linked by `AUTHORED` to
/// one of the papers the embedding step surfaced - not every researcher whose
/// own properties match, and not every paper's author.
#[tokio::test]
async fn scenario_3_mixed_type_and_bridges_through_authored_relation() {
    let model_cache = EmbeddingModelCache::new();
    model_cache.register(paper_fixture_model()).await;
    let stack = build_stack(model_cache).await;

    stack
        .schema
        .create_object_type(ObjectTypeDefinition::new("Paper", vec![Property::new("summary", PropertyDataType::Text)]))
        .await
        .unwrap();
    stack
        .schema
        .create_object_type(ObjectTypeDefinition::new("Researcher", vec![Property::new("specialty", PropertyDataType::Text)]))
        .await
        .unwrap();
    stack
        .schema
        .create_embedding_definition(EmbeddingDefinition::new("paper_summary_embedding", "Paper", "summary", "fixture-embed", 4))
        .await
        .unwrap();
    stack
        .schema
        .create_relation_type(RelationTypeDefinition::new("AUTHORED", vec!["Researcher".to_string()], vec!["Paper".to_string()]))
        .await
        .unwrap();

    let mut paper_ids = Vec::new();
    for summary in [
        "AI ethics and fairness in algorithms",
        "algorithmic bias and fairness in AI systems",
        "ethics of artificial intelligence decision making",
        "quantum entanglement and computing",
        "bioinformatics and gene sequencing",
    ] {
        let mut props = HashMap::new();
        props.insert("summary".to_string(), PropertyValue::Text(summary.to_string()));
        let obj = stack.instances.upsert_object("Paper", None, props, None).await.unwrap();
        paper_ids.push(obj.id());
    }
    let ai_ethics_paper = paper_ids[0];
    let quantum_paper = paper_ids[3];

    let mut props_a = HashMap::new();
    props_a.insert("specialty".to_string(), PropertyValue::Text("AI Ethics".to_string()));
    let researcher_a = stack.instances.upsert_object("Researcher", None, props_a, None).await.unwrap();

    let mut props_b = HashMap::new();
    props_b.insert("specialty".to_string(), PropertyValue::Text("Quantum Computing".to_string()));
    let researcher_b = stack.instances.upsert_object("Researcher", None, props_b, None).await.unwrap();

    let mut props_c = HashMap::new();
    props_c.insert("specialty".to_string(), PropertyValue::Text("AI Ethics".to_string()));
    let researcher_c = stack.instances.upsert_object("Researcher", None, props_c, None).await.unwrap();

    stack
        .instances
        .upsert_relation("AUTHORED", None, researcher_a.id(), ai_ethics_paper, HashMap::new(), None)
        .await
        .unwrap();
    stack
        .instances
        .upsert_relation("AUTHORED", None, researcher_b.id(), quantum_paper, HashMap::new(), None)
        .await
        .unwrap();
    // Researcher C matches the relational filter but authored a paper outside
    // the embedding step's hit set, so the bridge must still exclude them.
    stack
        .instances
        .upsert_relation("AUTHORED", None, researcher_c.id(), quantum_paper, HashMap::new(), None)
        .await
        .unwrap();

    let mut researcher_component = QueryComponent::new("Researcher");
    researcher_component.relational_filters.push(RelationalFilter::eq("specialty", PropertyValue::Text("AI Ethics".to_string())));

    let mut paper_component = QueryComponent::new("Paper");
    paper_component.embedding_searches.push(EmbeddingSearchClause {
        ed_name: "paper_summary_embedding".to_string(),
        similar_to_payload: "fairness in AI".to_string(),
        limit: 3,
        threshold: None,
        is_l2_distance: true,
        retrieve_full_objects: false,
    });

    let root = Clause::LogicalGroup {
        op: LogicalOperator::And,
        clauses: vec![Clause::Component(researcher_component), Clause::Component(paper_component)],
    };
    let query = ComplexQuery::from_root(root);
    let plan = stack.planner.plan(&query).await.unwrap();
    let result = stack.executor.execute(&plan).await.unwrap();

    assert!(result.errors.is_empty());
    assert_eq!(result.objects.len(), 1);
    assert_eq!(result.objects[0].id(), researcher_a.id());
    assert_eq!(result.objects[0].object_type_name, "Researcher");
}

/// Scenario 4: `(year==2023 AND venue==JFA) OR (year==2022 AND NOT
/// author==Carol)` over a six-paper fixture.
#[tokio::test]
async fn scenario_4_nested_boolean_query_over_relational_filters() {
    let stack = build_stack(EmbeddingModelCache::new()).await;
    stack
        .schema
        .create_object_type(ObjectTypeDefinition::new(
            "Paper",
            vec![
                Property::new("year", PropertyDataType::Integer),
                Property::new("venue", PropertyDataType::Text),
                Property::new("author", PropertyDataType::Text),
            ],
        ))
        .await
        .unwrap();

    async fn make_paper(stack: &Stack, year: i64, venue: &str, author: &str) -> Uuid {
        let mut props = HashMap::new();
        props.insert("year".to_string(), PropertyValue::Integer(year));
        props.insert("venue".to_string(), PropertyValue::Text(venue.to_string()));
        props.insert("author".to_string(), PropertyValue::Text(author.to_string()));
        stack.instances.upsert_object("Paper", None, props, None).await.unwrap().id()
    }

    let paper1 = make_paper(&stack, 2023, "JFA", "Alice").await;
    let paper2 = make_paper(&stack, 2022, "ICML", "Bob").await;
    let paper3 = make_paper(&stack, 2022, "NeurIPS", "Dave").await;
    let _excluded_carol = make_paper(&stack, 2022, "ICML", "Carol").await;
    let _excluded_wrong_venue = make_paper(&stack, 2023, "ICML", "Eve").await;
    let _excluded_wrong_year = make_paper(&stack, 2021, "JFA", "Frank").await;

    let mut left = QueryComponent::new("Paper");
    left.relational_filters.push(RelationalFilter::eq("year", PropertyValue::Integer(2023)));
    left.relational_filters.push(RelationalFilter::eq("venue", PropertyValue::Text("JFA".to_string())));

    let mut right_year = QueryComponent::new("Paper");
    right_year.relational_filters.push(RelationalFilter::eq("year", PropertyValue::Integer(2022)));

    let mut carol = QueryComponent::new("Paper");
    carol.relational_filters.push(RelationalFilter::eq("author", PropertyValue::Text("Carol".to_string())));

    let right = Clause::LogicalGroup {
        op: LogicalOperator::And,
        clauses: vec![Clause::Component(right_year), Clause::Not(Box::new(Clause::Component(carol)))],
    };
    let root = Clause::LogicalGroup { op: LogicalOperator::Or, clauses: vec![Clause::Component(left), right] };
    let query = ComplexQuery::from_root(root);

    let plan = stack.planner.plan(&query).await.unwrap();
    let result = stack.executor.execute(&plan).await.unwrap();

    let result_ids: HashSet<Uuid> = result.objects.iter().map(|o| o.id()).collect();
    assert_eq!(result_ids, HashSet::from([paper1, paper2, paper3]));
}

/// Scenario 5: deleting an object detaches its incident relations and makes
/// it unreachable by id.
#[tokio::test]
async fn scenario_5_delete_object_detaches_relations_and_disappears() {
    let dir = tempfile::tempdir().unwrap();
    let db = GrizabellaDb::connect(dir.path().join("library").to_str().unwrap(), true).await.unwrap();

    db.create_object_type(ObjectTypeDefinition::new("Author", vec![Property::new("name", PropertyDataType::Text)]))
        .await
        .unwrap();
    db.create_object_type(ObjectTypeDefinition::new("Book", vec![Property::new("title", PropertyDataType::Text)]))
        .await
        .unwrap();
    db.create_relation_type(RelationTypeDefinition::new("WRITTEN_BY", vec!["Book".to_string()], vec!["Author".to_string()]))
        .await
        .unwrap();

    let mut orwell_props = HashMap::new();
    orwell_props.insert("name".to_string(), PropertyValue::Text("George Orwell".to_string()));
    let orwell = db.upsert_object("Author", None, orwell_props, None).await.unwrap();

    let mut book_props = HashMap::new();
    book_props.insert("title".to_string(), PropertyValue::Text("1984".to_string()));
    let book = db.upsert_object("Book", None, book_props, None).await.unwrap();

    let relation = db.add_relation("WRITTEN_BY", book.id(), orwell.id(), HashMap::new(), None).await.unwrap();

    db.delete_object("Author", orwell.id()).await.unwrap();

    let fetched_relation = db.get_relation("WRITTEN_BY", relation.id()).await.unwrap();
    assert!(fetched_relation.is_none());

    let fetched_author = db.get_object_by_id("Author", orwell.id()).await.unwrap();
    assert!(fetched_author.is_none());

    db.close().await;
}

/// Scenario 6: concurrent `get_manager` calls for the same path share one
/// manager; once every caller releases, the path is fully closed and a fresh
/// `get_manager` opens a new manager rather than handing back a stale one.
#[tokio::test]
async fn scenario_6_concurrent_get_manager_refcounts_and_closes_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared_knowledge_base");
    let path_str = path.to_str().unwrap().to_string();
    let factory = DbManagerFactory::global();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let path_str = path_str.clone();
        handles.push(tokio::spawn(async move { factory.get_manager(&path_str, true).await.unwrap() }));
    }
    let managers: Vec<_> = futures::future::join_all(handles).await.into_iter().map(|r| r.unwrap()).collect();
    for manager in &managers[1..] {
        assert!(Arc::ptr_eq(&managers[0], manager));
    }

    for _ in 0..5 {
        factory.release(&path_str).await.unwrap();
    }
    // A stray extra release on an already-closed path must be a no-op, not an
    // error.
    factory.release(&path_str).await.unwrap();

    drop(managers);
    // The path was fully released and closed; opening it again must succeed
    // cleanly rather than handing back a manager whose substrates were
    // already torn down.
    let reopened = factory.get_manager(&path_str, true).await.unwrap();
    reopened
        .create_object_type(ObjectTypeDefinition::new("Smoke", vec![Property::new("ok", PropertyDataType::Boolean)]))
        .await
        .unwrap();
    factory.release(&path_str).await.unwrap();
}
