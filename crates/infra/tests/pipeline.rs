//! End-to-end lifecycle: create -> train -> predict -> deploy.

use std::sync::Arc;

use forgeml_ai::{
    AlgorithmParams, MetricKind, ModelArtifact, ModelType, PredictionOutput, TargetValue,
    TrainingData,
};
use forgeml_core::{AggregateRoot, TenantId};
use forgeml_infra::{
    InMemoryModelStore, MlPipeline, ModelFilter, PipelineConfig, PipelineError, PredictionRequest,
};
use forgeml_models::{DatasetType, Model, ModelStatus, NewModel, TrainingJobStatus};

fn pipeline() -> MlPipeline<Arc<InMemoryModelStore>> {
    forgeml_observability::init_for_tests();
    MlPipeline::in_memory(PipelineConfig::default())
}

fn regression_model(pipeline: &MlPipeline<Arc<InMemoryModelStore>>, tenant: TenantId) -> Model {
    pipeline
        .create_model(
            NewModel::new(tenant, "price", ModelType::Regression)
                .with_feature_columns(["x"])
                .with_target_column("y"),
        )
        .unwrap()
}

fn line_data() -> TrainingData {
    TrainingData::numeric(
        vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]],
        vec![2.0, 4.0, 6.0, 8.0],
    )
}

#[test]
fn scenario_a_regression_trains_exact_line() -> anyhow::Result<()> {
    let pipeline = pipeline();
    let tenant = TenantId::new();
    let model = regression_model(&pipeline, tenant);

    let handle = pipeline.train_model(tenant, *model.id(), line_data(), None)?;
    assert_eq!(handle.job().status, TrainingJobStatus::Running);
    let job = handle.wait()?;
    assert_eq!(job.status, TrainingJobStatus::Completed);
    assert_eq!(job.dataset_size, 4);
    assert!(job.end_time.is_some());

    let trained = pipeline.get_model(tenant, *model.id())?;
    assert_eq!(trained.status(), ModelStatus::Trained);
    assert!(!trained.is_production());
    assert_eq!(trained.training_data_size(), 4);

    let artifact = ModelArtifact::decode(trained.artifact().unwrap())?;
    let ModelArtifact::Regression(regression) = artifact else {
        panic!("expected a regression artifact");
    };
    assert!((regression.equation[0] - 2.0).abs() < 1e-9);
    assert!(regression.equation[1].abs() < 1e-9);
    assert!((trained.performance().r2_score.unwrap() - 1.0).abs() < 1e-9);

    let metrics = pipeline.get_model_metrics(tenant, *model.id())?;
    let kinds: Vec<MetricKind> = metrics.iter().map(|m| m.metric_type).collect();
    assert_eq!(
        kinds,
        vec![MetricKind::Accuracy, MetricKind::Mse, MetricKind::Mae, MetricKind::R2Score]
    );
    assert!(metrics.iter().all(|m| m.dataset_type == DatasetType::Training));
    Ok(())
}

#[test]
fn scenario_b_prediction_on_trained_regression() -> anyhow::Result<()> {
    let pipeline = pipeline();
    let tenant = TenantId::new();
    let model = regression_model(&pipeline, tenant);
    pipeline.train_model(tenant, *model.id(), line_data(), None)?.wait()?;

    let result = pipeline.predict(
        tenant,
        *model.id(),
        PredictionRequest::new(vec![vec![5.0]]).with_context(serde_json::json!({"source": "test"})),
    )?;
    let value = result.prediction.primary().unwrap();
    assert!((value - 10.0).abs() < 1e-9);
    assert!(result.confidence <= 0.95);
    assert_eq!(result.model_used, *model.id());

    let after = pipeline.get_model(tenant, *model.id())?;
    assert_eq!(after.usage_count(), 1);
    assert_eq!(after.last_used_date(), Some(result.timestamp));

    let predictions = pipeline.list_predictions(tenant, *model.id())?;
    assert_eq!(predictions.len(), 1);
    assert_eq!(predictions[0].id, result.prediction_id);
    assert_eq!(predictions[0].input_data, vec![vec![5.0]]);
    assert_eq!(predictions[0].context, Some(serde_json::json!({"source": "test"})));
    Ok(())
}

#[test]
fn scenario_c_clustering_separates_two_groups() -> anyhow::Result<()> {
    let pipeline = pipeline();
    let tenant = TenantId::new();
    let model = pipeline.create_model(
        NewModel::new(tenant, "segments", ModelType::Clustering)
            .with_feature_columns(["a", "b"])
            .with_config_params(AlgorithmParams::Clustering {
                k: 2,
                max_iterations: 100,
            }),
    )?;
    let points = vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![10.0, 10.0], vec![10.0, 11.0]];
    pipeline
        .train_model(tenant, *model.id(), TrainingData::unlabeled(points.clone()), None)?
        .wait()?;

    let trained = pipeline.get_model(tenant, *model.id())?;
    let ModelArtifact::Clustering(clustering) = ModelArtifact::decode(trained.artifact().unwrap())? else {
        panic!("expected a clustering artifact");
    };
    assert_eq!(clustering.centroids.len(), 2);
    assert_ne!(clustering.centroids[0], clustering.centroids[1]);
    for (point, &cluster) in points.iter().zip(&clustering.clusters) {
        let own = forgeml_ai::linalg::euclidean_distance(point, &clustering.centroids[cluster]);
        for centroid in &clustering.centroids {
            assert!(own <= forgeml_ai::linalg::euclidean_distance(point, centroid));
        }
    }

    let result = pipeline.predict(tenant, *model.id(), PredictionRequest::new(vec![vec![9.5, 10.5]]))?;
    let PredictionOutput::Clusters { clusters, .. } = result.prediction else {
        panic!("expected cluster output");
    };
    assert_eq!(clusters, vec![clustering.clusters[2]]);
    assert_eq!(result.confidence, 0.8);
    Ok(())
}

#[test]
fn scenario_d_non_numeric_target_is_rejected_before_any_job() {
    let pipeline = pipeline();
    let tenant = TenantId::new();
    let model = regression_model(&pipeline, tenant);

    let data = TrainingData::new(
        vec![vec![1.0], vec![2.0]],
        vec![TargetValue::Number(1.0), TargetValue::from("high")],
    );
    let err = pipeline
        .train_model(tenant, *model.id(), data, None)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));

    assert!(pipeline.list_training_jobs(tenant, *model.id()).unwrap().is_empty());
    assert_eq!(
        pipeline.get_model(tenant, *model.id()).unwrap().status(),
        ModelStatus::Training
    );
}

#[test]
fn time_series_forecast_extends_history() -> anyhow::Result<()> {
    let pipeline = pipeline();
    let tenant = TenantId::new();
    let model = pipeline.create_model(
        NewModel::new(tenant, "weekly units", ModelType::TimeSeries)
            .with_target_column("units")
            .with_config_params(AlgorithmParams::TimeSeries { window_size: 3 }),
    )?;
    let series: Vec<f64> = (1..=10).map(f64::from).collect();
    pipeline
        .train_model(tenant, *model.id(), TrainingData::series(series), None)?
        .wait()?;

    let result = pipeline.predict(
        tenant,
        *model.id(),
        PredictionRequest::new(vec![vec![11.0, 12.0]]).with_prediction_type(ModelType::TimeSeries),
    )?;
    let PredictionOutput::Forecast { value, window } = result.prediction else {
        panic!("expected a forecast");
    };
    assert_eq!(window, vec![10.0, 11.0, 12.0]);
    assert!((value - 11.0).abs() < 1e-12);
    assert!(result.confidence <= 0.9);
    Ok(())
}

#[test]
fn classification_serves_real_inference() -> anyhow::Result<()> {
    let pipeline = pipeline();
    let tenant = TenantId::new();
    let model = pipeline.create_model(
        NewModel::new(tenant, "churn", ModelType::Classification)
            .with_feature_columns(["score"])
            .with_target_column("churned")
            .with_config_params(AlgorithmParams::Classification {
                hidden_layers: vec![8],
                dropout: 0.0,
            }),
    )?;
    let mut features = Vec::new();
    let mut target = Vec::new();
    for i in 1..=20 {
        features.push(vec![i as f64 / 10.0]);
        target.push(1.0);
        features.push(vec![-(i as f64) / 10.0]);
        target.push(0.0);
    }
    let config = forgeml_ai::TrainingConfig::new(AlgorithmParams::Classification {
        hidden_layers: vec![8],
        dropout: 0.0,
    })
    .with_epochs(200)
    .with_batch_size(8)
    .with_learning_rate(0.01)
    .with_validation_split(0.25);

    let job = pipeline
        .train_model(tenant, *model.id(), TrainingData::numeric(features, target), Some(config))?
        .wait()?;
    assert!(job.validation_accuracy.unwrap() >= 0.8);
    assert!(job.validation_loss.is_some());

    let metrics = pipeline.get_model_metrics(tenant, *model.id())?;
    let accuracy = metrics
        .iter()
        .find(|m| m.metric_type == MetricKind::Accuracy)
        .unwrap();
    assert_eq!(accuracy.dataset_type, DatasetType::Validation);

    let first = pipeline.predict(tenant, *model.id(), PredictionRequest::new(vec![vec![1.5], vec![-1.5]]))?;
    let second = pipeline.predict(tenant, *model.id(), PredictionRequest::new(vec![vec![1.5], vec![-1.5]]))?;
    let PredictionOutput::Classification { labels, probabilities } = &first.prediction else {
        panic!("expected classification output");
    };
    assert_eq!(labels, &vec![1, 0]);
    assert!(probabilities.iter().all(|p| (0.0..=1.0).contains(p)));
    assert_eq!(first.prediction, second.prediction);
    assert!((0.5..=1.0).contains(&first.confidence));
    Ok(())
}

#[test]
fn deploy_only_from_trained() -> anyhow::Result<()> {
    let pipeline = pipeline();
    let tenant = TenantId::new();
    let model = regression_model(&pipeline, tenant);

    let err = pipeline.deploy_model(tenant, *model.id()).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidState(_)));

    pipeline.train_model(tenant, *model.id(), line_data(), None)?.wait()?;
    let deployed = pipeline.deploy_model(tenant, *model.id())?;
    assert_eq!(deployed.status(), ModelStatus::Deployed);
    assert!(deployed.is_production());

    let production = pipeline.list_models(tenant, &ModelFilter::all().production_only())?;
    assert_eq!(production.len(), 1);

    // deployed models still serve predictions
    pipeline.predict(tenant, *model.id(), PredictionRequest::new(vec![vec![1.0]]))?;

    // retraining takes the model out of production
    pipeline.train_model(tenant, *model.id(), line_data(), None)?.wait()?;
    let retrained = pipeline.get_model(tenant, *model.id())?;
    assert_eq!(retrained.status(), ModelStatus::Trained);
    assert!(!retrained.is_production());
    assert_eq!(retrained.artifact_revision(), 2);
    Ok(())
}

#[test]
fn untrained_model_cannot_predict() {
    let pipeline = pipeline();
    let tenant = TenantId::new();
    let model = regression_model(&pipeline, tenant);

    let err = pipeline
        .predict(tenant, *model.id(), PredictionRequest::new(vec![vec![1.0]]))
        .unwrap_err();
    assert_eq!(err, PipelineError::ModelNotTrained(*model.id()));
    assert!(pipeline.list_predictions(tenant, *model.id()).unwrap().is_empty());
}

#[test]
fn prediction_type_must_match_model() -> anyhow::Result<()> {
    let pipeline = pipeline();
    let tenant = TenantId::new();
    let model = regression_model(&pipeline, tenant);
    pipeline.train_model(tenant, *model.id(), line_data(), None)?.wait()?;

    let err = pipeline
        .predict(
            tenant,
            *model.id(),
            PredictionRequest::new(vec![vec![1.0]]).with_prediction_type(ModelType::Clustering),
        )
        .unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));
    assert_eq!(pipeline.get_model(tenant, *model.id())?.usage_count(), 0);
    Ok(())
}

#[test]
fn other_tenants_cannot_see_models() -> anyhow::Result<()> {
    let pipeline = pipeline();
    let tenant = TenantId::new();
    let intruder = TenantId::new();
    let model = regression_model(&pipeline, tenant);

    assert_eq!(
        pipeline.get_model(intruder, *model.id()).unwrap_err(),
        PipelineError::ModelNotFound(*model.id())
    );
    assert!(matches!(
        pipeline.train_model(intruder, *model.id(), line_data(), None),
        Err(PipelineError::ModelNotFound(_))
    ));
    assert!(pipeline.list_models(intruder, &ModelFilter::all())?.is_empty());
    Ok(())
}

#[test]
fn create_model_validates_request() {
    let pipeline = pipeline();
    let err = pipeline
        .create_model(NewModel::new(TenantId::new(), "no features", ModelType::Regression).with_target_column("y"))
        .unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));
}

#[test]
fn unknown_model_type_label_is_unsupported() {
    let err: PipelineError = "svm"
        .parse::<ModelType>()
        .map_err(PipelineError::from)
        .unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedModelType(_)));
}

#[test]
fn artifact_cache_is_populated_by_predictions() -> anyhow::Result<()> {
    let pipeline = pipeline();
    let tenant = TenantId::new();
    let model = regression_model(&pipeline, tenant);
    pipeline.train_model(tenant, *model.id(), line_data(), None)?.wait()?;

    assert!(pipeline.artifact_cache().is_empty());
    pipeline.predict(tenant, *model.id(), PredictionRequest::new(vec![vec![1.0]]))?;
    pipeline.predict(tenant, *model.id(), PredictionRequest::new(vec![vec![2.0]]))?;
    assert_eq!(pipeline.artifact_cache().len(), 1);

    // retrain drops the stale entry
    pipeline.train_model(tenant, *model.id(), line_data(), None)?.wait()?;
    assert!(pipeline.artifact_cache().is_empty());
    Ok(())
}
