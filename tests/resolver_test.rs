use serde_json::json;
use taskline::error::PipelineError;
use taskline::pipeline::builder::PipelineBuilder;
use taskline::runtime::resolver::Resolver;
use taskline::runtime::store::{MemoryStore, ResultStore};

#[tokio::test]
async fn diamond_resolves_in_declaration_order() {
    let pipeline = PipelineBuilder::new("diamond")
        .task("a")
        .build()
        .task("b")
        .after("a")
        .build()
        .task("c")
        .after("a")
        .build()
        .task("d")
        .after("b")
        .after("c")
        .build()
        .build();

    let store = MemoryStore::new();
    let plan = Resolver::new(&pipeline, &store)
        .resolve("d")
        .await
        .expect("resolution failed");

    let order: Vec<&str> = plan.steps.iter().map(|s| s.id.kind.as_str()).collect();
    assert_eq!(order, vec!["a", "b", "c", "d"]);
    assert!(plan.steps.iter().all(|s| !s.already_complete));
}

#[tokio::test]
async fn every_dependency_precedes_its_dependents() {
    let pipeline = PipelineBuilder::new("wide")
        .task("ingest")
        .build()
        .task("clean")
        .after("ingest")
        .build()
        .task("features")
        .after("clean")
        .build()
        .task("labels")
        .after("clean")
        .build()
        .task("train")
        .after("features")
        .after("labels")
        .build()
        .build();

    let store = MemoryStore::new();
    let plan = Resolver::new(&pipeline, &store).resolve("train").await.unwrap();

    let pos = |kind: &str| {
        plan.steps
            .iter()
            .position(|s| s.id.kind == kind)
            .unwrap_or_else(|| panic!("{} missing from plan", kind))
    };
    for decl in &pipeline.tasks {
        for dep in &decl.depends_on {
            assert!(pos(dep) < pos(&decl.kind), "{} must precede {}", dep, decl.kind);
        }
    }
}

#[tokio::test]
async fn mutual_dependency_is_a_cycle() {
    let pipeline = PipelineBuilder::new("cyclic")
        .task("a")
        .after("b")
        .build()
        .task("b")
        .after("a")
        .build()
        .build();

    let store = MemoryStore::new();
    let err = Resolver::new(&pipeline, &store).resolve("a").await.unwrap_err();
    assert!(matches!(err, PipelineError::CyclicDependency(_)));
}

#[tokio::test]
async fn self_dependency_is_a_cycle() {
    let pipeline = PipelineBuilder::new("selfish")
        .task("a")
        .after("a")
        .build()
        .build();

    let store = MemoryStore::new();
    let err = Resolver::new(&pipeline, &store).resolve("a").await.unwrap_err();
    assert!(matches!(err, PipelineError::CyclicDependency(_)));
}

#[tokio::test]
async fn undeclared_edge_is_unknown_task() {
    let pipeline = PipelineBuilder::new("dangling")
        .task("a")
        .after("ghost")
        .build()
        .build();

    let store = MemoryStore::new();
    let err = Resolver::new(&pipeline, &store).resolve("a").await.unwrap_err();
    assert!(matches!(err, PipelineError::UnknownTask(kind) if kind == "ghost"));
}

#[tokio::test]
async fn complete_task_prunes_its_ancestors() {
    let pipeline = PipelineBuilder::new("chain")
        .task("a")
        .build()
        .task("b")
        .after("a")
        .build()
        .task("c")
        .after("b")
        .build()
        .build();

    let store = MemoryStore::new();
    let b_id = pipeline.identity("b").unwrap();
    store.save(&b_id, &json!("cached")).await.unwrap();

    let plan = Resolver::new(&pipeline, &store).resolve("c").await.unwrap();
    let order: Vec<(&str, bool)> = plan
        .steps
        .iter()
        .map(|s| (s.id.kind.as_str(), s.already_complete))
        .collect();

    // b is trusted as complete, a is never visited.
    assert_eq!(order, vec![("b", true), ("c", false)]);
}
