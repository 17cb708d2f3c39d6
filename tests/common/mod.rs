#![allow(dead_code)]

use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

pub const RUN_ID: &str = "544c4173775c4af6954bb0b29416626f";

pub const PICKLE: &[u8] = b"\x80\x04\x95fake-pickle\x94.";

/// `MLmodel` document for an sklearn model saved with `serialization_format`.
pub fn sklearn_mlmodel(serialization_format: &str) -> String {
    format!(
        "\
artifact_path: model
flavors:
  python_function:
    env:
      conda: conda.yaml
      virtualenv: python_env.yaml
    loader_module: mlflow.sklearn
    model_path: model.pkl
    predict_fn: predict
    python_version: 3.11.7
  sklearn:
    code: null
    pickled_model: model.pkl
    serialization_format: {}
    sklearn_version: 1.4.2
mlflow_version: 2.11.1
model_uuid: 0a1b2c3d4e5f40718293a4b5c6d7e8f9
run_id: {}
utc_time_created: '2025-03-01 10:00:00.000000'
",
        serialization_format, RUN_ID
    )
}

/// `mlflow.log-model.history` tag value recording one model with `flavors`.
pub fn history(flavors: Value) -> String {
    json!([{
        "run_id": RUN_ID,
        "artifact_path": "model",
        "utc_time_created": "2025-03-01 10:00:00.000000",
        "model_uuid": "0a1b2c3d4e5f40718293a4b5c6d7e8f9",
        "flavors": flavors
    }])
    .to_string()
}

pub fn sklearn_flavors(serialization_format: &str) -> Value {
    json!({
        "python_function": {
            "model_path": "model.pkl",
            "predict_fn": "predict",
            "loader_module": "mlflow.sklearn",
            "python_version": "3.11.7"
        },
        "sklearn": {
            "pickled_model": "model.pkl",
            "sklearn_version": "1.4.2",
            "serialization_format": serialization_format,
            "code": null
        }
    })
}

pub fn history_tag(flavors: Value) -> Value {
    json!({ "key": "mlflow.log-model.history", "value": history(flavors) })
}

pub fn run_body(tags: Vec<Value>) -> Value {
    json!({
        "run": {
            "info": {
                "run_id": RUN_ID,
                "run_uuid": RUN_ID,
                "run_name": "gentle-owl",
                "experiment_id": "0",
                "status": "FINISHED",
                "artifact_uri": format!("mlflow-artifacts:/0/{}/artifacts", RUN_ID),
                "lifecycle_stage": "active"
            },
            "data": { "tags": tags }
        }
    })
}

/// Mounts `runs:/RUN_ID/model` with the given run tags and model directory
/// contents (`model/<name>` -> body).
pub async fn mount_model_run(server: &MockServer, tags: Vec<Value>, files: &[(&str, &[u8])]) {
    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/runs/get"))
        .and(query_param("run_id", RUN_ID))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_body(tags)))
        .mount(server)
        .await;

    let listing: Vec<Value> = files
        .iter()
        .map(|(name, body)| {
            json!({
                "path": format!("model/{}", name),
                "is_dir": false,
                "file_size": body.len().to_string()
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/artifacts/list"))
        .and(query_param("path", "model"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "root_uri": format!("mlflow-artifacts:/0/{}/artifacts", RUN_ID),
            "files": listing
        })))
        .mount(server)
        .await;

    for (name, body) in files {
        Mock::given(method("GET"))
            .and(path("/get-artifact"))
            .and(query_param("path", format!("model/{}", name)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(server)
            .await;
    }
}

/// Mounts a tracking server holding one sklearn model under `runs:/RUN_ID/model`,
/// with the run's history tag agreeing with the `MLmodel` file.
pub async fn mount_sklearn_run(server: &MockServer, serialization_format: &str) {
    let mlmodel = sklearn_mlmodel(serialization_format);
    mount_model_run(
        server,
        vec![history_tag(sklearn_flavors(serialization_format))],
        &[("MLmodel", mlmodel.as_bytes()), ("model.pkl", PICKLE)],
    )
    .await;
}

pub async fn mount_unknown_run(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/runs/get"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error_code": "RESOURCE_DOES_NOT_EXIST",
            "message": "Run with id=unknown not found"
        })))
        .mount(server)
        .await;
}
