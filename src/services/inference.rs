//! Scaling and regression over the assembled feature vector.
//!
//! The fitted scaler and model are opaque capabilities behind two traits so the
//! pipeline never depends on how they were trained or serialized. The JSON
//! artifacts below are one such backing: a standard scaler (per-feature center
//! and scale) and a linear regressor, each carrying the feature names it was
//! fitted on.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ArtifactError, PredictionError};
use crate::models::prediction::{FeatureVector, Prediction};

/// A fitted, read-only feature transform.
pub trait FeatureTransform: Send + Sync {
    fn feature_names(&self) -> &[String];
    fn transform(&self, features: &FeatureVector) -> Result<FeatureVector, PredictionError>;
}

/// A fitted, read-only regression model.
pub trait Regressor: Send + Sync {
    fn feature_names(&self) -> &[String];
    fn predict(&self, features: &FeatureVector) -> Result<f64, PredictionError>;
}

/// Rejects a vector whose columns differ from `expected` in count or order.
fn check_schema(expected: &[String], features: &FeatureVector) -> Result<(), PredictionError> {
    if features.is_empty()
        || features.len() != expected.len()
        || features.names.len() != features.values.len()
    {
        return Err(PredictionError::SchemaMismatch(format!(
            "expected {} features, got {}",
            expected.len(),
            features.len()
        )));
    }
    if let Some((i, (want, got))) = expected
        .iter()
        .zip(features.names.iter())
        .enumerate()
        .find(|(_, (want, got))| want != got)
    {
        return Err(PredictionError::SchemaMismatch(format!(
            "column {} is {}, expected {}",
            i, got, want
        )));
    }
    Ok(())
}

// ─── Standard scaler ─────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn validate(&self) -> Result<(), ArtifactError> {
        let n = self.feature_names.len();
        if n == 0 || self.mean.len() != n || self.scale.len() != n {
            return Err(ArtifactError::Invalid(format!(
                "scaler has {} names, {} means, {} scales",
                n,
                self.mean.len(),
                self.scale.len()
            )));
        }
        Ok(())
    }
}

impl FeatureTransform for StandardScaler {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn transform(&self, features: &FeatureVector) -> Result<FeatureVector, PredictionError> {
        check_schema(&self.feature_names, features)?;

        let values = features
            .values
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(x, (mean, scale))| {
                // constant columns are exported with scale 0; leave them centered only
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect();

        Ok(FeatureVector { names: features.names.clone(), values })
    }
}

// ─── Linear regressor ────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct LinearRegressor {
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearRegressor {
    fn validate(&self) -> Result<(), ArtifactError> {
        if self.feature_names.is_empty() || self.coefficients.len() != self.feature_names.len() {
            return Err(ArtifactError::Invalid(format!(
                "model has {} names, {} coefficients",
                self.feature_names.len(),
                self.coefficients.len()
            )));
        }
        Ok(())
    }
}

impl Regressor for LinearRegressor {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, PredictionError> {
        check_schema(&self.feature_names, features)?;

        Ok(features
            .values
            .iter()
            .zip(self.coefficients.iter())
            .map(|(f, c)| f * c)
            .sum::<f64>()
            + self.intercept)
    }
}

// ─── Artifact loading ────────────────────────────────────────

fn read_artifact<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ArtifactError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path)
        .map_err(|source| ArtifactError::Read { path: display.clone(), source })?;
    serde_json::from_str(&content).map_err(|source| ArtifactError::Parse { path: display, source })
}

pub fn load_scaler(path: impl AsRef<Path>) -> Result<StandardScaler, ArtifactError> {
    let scaler: StandardScaler = read_artifact(path.as_ref())?;
    scaler.validate()?;
    info!(path = %path.as_ref().display(), features = scaler.feature_names.len(), "scaler loaded");
    Ok(scaler)
}

pub fn load_regressor(path: impl AsRef<Path>) -> Result<LinearRegressor, ArtifactError> {
    let model: LinearRegressor = read_artifact(path.as_ref())?;
    model.validate()?;
    info!(path = %path.as_ref().display(), features = model.feature_names.len(), "model loaded");
    Ok(model)
}

// ─── Pipeline ────────────────────────────────────────────────

/// Scale then predict. Built once at startup and shared read-only.
pub struct InferencePipeline {
    scaler: Box<dyn FeatureTransform>,
    model: Box<dyn Regressor>,
}

impl InferencePipeline {
    /// Fails if the two artifacts were not fitted on the same columns, or not
    /// on `expected` when given.
    pub fn new(
        scaler: Box<dyn FeatureTransform>,
        model: Box<dyn Regressor>,
        expected: Option<&[&str]>,
    ) -> Result<Self, ArtifactError> {
        if scaler.feature_names() != model.feature_names() {
            return Err(ArtifactError::Invalid(
                "scaler and model were fitted on different feature columns".to_string(),
            ));
        }
        if let Some(expected) = expected {
            let fitted = scaler.feature_names();
            if fitted.len() != expected.len() || fitted.iter().zip(expected).any(|(a, b)| a != b) {
                return Err(ArtifactError::Invalid(format!(
                    "artifacts expect {:?}, pipeline produces {:?}",
                    fitted, expected
                )));
            }
        }
        Ok(Self { scaler, model })
    }

    pub fn feature_names(&self) -> &[String] {
        self.scaler.feature_names()
    }

    /// The model output is returned as is, without clamping.
    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction, PredictionError> {
        let scaled = self.scaler.transform(features)?;
        let kilowatts = self.model.predict(&scaled)?;
        debug!(kilowatts, "model prediction");
        Ok(Prediction { kilowatts })
    }
}
