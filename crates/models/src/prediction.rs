use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgeml_ai::{ModelType, PredictionOutput};
use forgeml_core::{ModelId, PredictionId, TenantId};

/// Immutable record of one inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: PredictionId,
    pub tenant_id: TenantId,
    pub model_id: ModelId,
    pub prediction_type: ModelType,
    pub input_data: Vec<Vec<f64>>,
    pub output_data: PredictionOutput,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub context: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}
