use std::io::Write;

use taskline::pipeline::loader::{load_pipeline_from_yaml, pipeline_from_yaml_str};

const MOVIE_YAML: &str = r#"
id: movie-ratings
name: Movie rating prediction
tasks:
  - kind: get_data
  - kind: preprocess
    depends_on: [get_data]
  - kind: map_movie_ids
    depends_on: [preprocess]
  - kind: train_model
    params:
      model: svd
    depends_on: [map_movie_ids]
"#;

#[test]
fn parses_a_pipeline_declaration() {
    let pipeline = pipeline_from_yaml_str(MOVIE_YAML).unwrap();
    assert_eq!(pipeline.id, "movie-ratings");
    assert_eq!(pipeline.tasks.len(), 4);

    let train = pipeline.decl("train_model").unwrap();
    assert_eq!(train.depends_on, vec!["map_movie_ids".to_string()]);
    assert_eq!(
        pipeline.identity("train_model").unwrap().key(),
        "train_model?model=\"svd\""
    );

    // Missing params/depends_on default to empty.
    let ingest = pipeline.decl("get_data").unwrap();
    assert!(ingest.params.is_empty());
    assert!(ingest.depends_on.is_empty());
}

#[test]
fn rejects_duplicate_kinds() {
    let yaml = r#"
id: dup
name: dup
tasks:
  - kind: a
  - kind: a
"#;
    let err = pipeline_from_yaml_str(yaml).unwrap_err();
    assert!(err.to_string().contains("Duplicate task kind"));
}

#[test]
fn loads_from_a_file_with_context_on_failure() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MOVIE_YAML.as_bytes()).unwrap();

    let pipeline = load_pipeline_from_yaml(file.path()).unwrap();
    assert_eq!(pipeline.tasks.len(), 4);

    let err = load_pipeline_from_yaml("/nonexistent/pipeline.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read YAML file"));
}
