//! Versioned persistence for the (model, preprocessor) pair.
//!
//! Layout inside the artifact directory:
//!
//! ```text
//! manifest.json                 names the current pair
//! model-<id>.json               envelope around the classifier
//! preprocessor-<id>.json        envelope around the fitted preprocessor
//! ```
//!
//! Both blobs are written and synced before `manifest.json` is replaced via
//! rename, so a reader sees either the old pair or the new pair, never a mix.

use crate::config::ArtifactConfig;
use crate::error::{PipelineError, Result};
use crate::models::gbdt::GradientBoostedClassifier;
use crate::preprocessing::FittedPreprocessor;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Bumped whenever the on-disk layout changes
pub const FORMAT_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    format_version: u32,
    artifact_id: Uuid,
    created_at: DateTime<Utc>,
    payload: T,
}

/// Points at the blobs of the current pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub artifact_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub model_file: String,
    pub preprocessor_file: String,
    pub target_column: String,
    pub feature_names: Vec<String>,
}

/// A model and the preprocessor it was trained behind
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPair {
    pub artifact_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub model: GradientBoostedClassifier,
    pub preprocessor: FittedPreprocessor,
}

impl ArtifactPair {
    /// Pair a freshly trained model with its preprocessor under a new id
    pub fn new(model: GradientBoostedClassifier, preprocessor: FittedPreprocessor) -> Result<Self> {
        check_compatible(&model, &preprocessor, Path::new("<memory>"))?;
        Ok(Self {
            artifact_id: Uuid::new_v4(),
            created_at: Utc::now(),
            model,
            preprocessor,
        })
    }
}

fn check_compatible(
    model: &GradientBoostedClassifier,
    preprocessor: &FittedPreprocessor,
    path: &Path,
) -> Result<()> {
    if model.n_features() != preprocessor.feature_count() {
        return Err(PipelineError::artifact_load(
            path,
            format!(
                "model expects {} features but preprocessor produces {}",
                model.n_features(),
                preprocessor.feature_count()
            ),
        ));
    }
    Ok(())
}

/// The manifest's target and feature names must describe the loaded preprocessor
fn check_manifest_layout(
    manifest: &Manifest,
    preprocessor: &FittedPreprocessor,
    path: &Path,
) -> Result<()> {
    if manifest.target_column != preprocessor.target_column() {
        return Err(PipelineError::artifact_load(
            path,
            format!(
                "manifest target '{}' does not match preprocessor target '{}'",
                manifest.target_column,
                preprocessor.target_column()
            ),
        ));
    }
    let fitted = preprocessor.feature_names();
    if manifest.feature_names != fitted {
        return Err(PipelineError::artifact_load(
            path,
            format!(
                "manifest features {:?} do not match preprocessor features {:?}",
                manifest.feature_names, fitted
            ),
        ));
    }
    Ok(())
}

/// Reads and writes artifact pairs in one directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Store rooted at `dir` (created on first save)
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Store at the configured artifact directory
    pub fn from_config(config: &ArtifactConfig) -> Self {
        Self::new(config.dir.clone())
    }

    /// Artifact directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the manifest naming the current pair
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Whether a manifest has been committed
    pub fn exists(&self) -> bool {
        self.manifest_path().is_file()
    }

    /// Persist `pair` and make it the current one
    pub fn save(&self, pair: &ArtifactPair) -> Result<Manifest> {
        fs::create_dir_all(&self.dir).map_err(|e| write_err(&self.dir, e))?;
        let previous = self.read_manifest().ok();

        let id = pair.artifact_id;
        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            artifact_id: id,
            created_at: pair.created_at,
            model_file: format!("model-{}.json", id),
            preprocessor_file: format!("preprocessor-{}.json", id),
            target_column: pair.preprocessor.target_column().to_string(),
            feature_names: pair
                .preprocessor
                .feature_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        };

        self.write_envelope(&manifest.model_file, pair, &pair.model)?;
        self.write_envelope(&manifest.preprocessor_file, pair, &pair.preprocessor)?;

        let tmp = self.dir.join(format!("{}.tmp", MANIFEST_FILE));
        let bytes = serde_json::to_vec_pretty(&manifest).map_err(|e| write_err(&tmp, e.into()))?;
        write_synced(&tmp, &bytes)?;
        let target = self.manifest_path();
        fs::rename(&tmp, &target).map_err(|e| write_err(&target, e))?;
        sync_dir(&self.dir)?;

        info!(
            artifact_id = %id,
            dir = %self.dir.display(),
            features = manifest.feature_names.len(),
            "Artifact pair saved"
        );

        if let Some(old) = previous.filter(|m| m.artifact_id != id) {
            for file in [&old.model_file, &old.preprocessor_file] {
                if let Err(e) = fs::remove_file(self.dir.join(file)) {
                    warn!(file = %file, error = %e, "Failed to remove superseded artifact");
                }
            }
        }
        Ok(manifest)
    }

    /// Load the current pair, validating version, ids and feature layout
    pub fn load(&self) -> Result<ArtifactPair> {
        let manifest = self.read_manifest()?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(PipelineError::artifact_load(
                self.manifest_path(),
                format!(
                    "unsupported format version {} (expected {})",
                    manifest.format_version, FORMAT_VERSION
                ),
            ));
        }

        let model: Envelope<GradientBoostedClassifier> = self.read_envelope(&manifest, &manifest.model_file)?;
        let preprocessor: Envelope<FittedPreprocessor> =
            self.read_envelope(&manifest, &manifest.preprocessor_file)?;
        check_compatible(&model.payload, &preprocessor.payload, &self.dir)?;
        check_manifest_layout(&manifest, &preprocessor.payload, &self.manifest_path())?;

        debug!(artifact_id = %manifest.artifact_id, "Artifact pair loaded");
        Ok(ArtifactPair {
            artifact_id: manifest.artifact_id,
            created_at: manifest.created_at,
            model: model.payload,
            preprocessor: preprocessor.payload,
        })
    }

    /// Parse the current manifest without loading the blobs
    pub fn read_manifest(&self) -> Result<Manifest> {
        let path = self.manifest_path();
        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => PipelineError::artifact_load(&path, "no saved artifacts"),
            _ => PipelineError::artifact_load(&path, e.to_string()),
        })?;
        serde_json::from_slice(&bytes)
            .map_err(|e| PipelineError::artifact_load(&path, format!("corrupt manifest: {}", e)))
    }

    fn write_envelope<T: Serialize>(&self, file: &str, pair: &ArtifactPair, payload: &T) -> Result<()> {
        let path = self.dir.join(file);
        let envelope = Envelope {
            format_version: FORMAT_VERSION,
            artifact_id: pair.artifact_id,
            created_at: pair.created_at,
            payload,
        };
        let bytes = serde_json::to_vec(&envelope).map_err(|e| write_err(&path, e.into()))?;
        write_synced(&path, &bytes)
    }

    fn read_envelope<T: DeserializeOwned>(&self, manifest: &Manifest, file: &str) -> Result<Envelope<T>> {
        let path = self.dir.join(file);
        let bytes = fs::read(&path).map_err(|e| PipelineError::artifact_load(&path, e.to_string()))?;
        let envelope: Envelope<T> = serde_json::from_slice(&bytes)
            .map_err(|e| PipelineError::artifact_load(&path, format!("corrupt artifact: {}", e)))?;
        if envelope.format_version != FORMAT_VERSION {
            return Err(PipelineError::artifact_load(
                &path,
                format!("unsupported format version {}", envelope.format_version),
            ));
        }
        if envelope.artifact_id != manifest.artifact_id {
            return Err(PipelineError::artifact_load(
                &path,
                format!(
                    "artifact id {} does not match manifest {}",
                    envelope.artifact_id, manifest.artifact_id
                ),
            ));
        }
        Ok(envelope)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| write_err(path, e))?;
    file.write_all(bytes).map_err(|e| write_err(path, e))?;
    file.sync_all().map_err(|e| write_err(path, e))
}

/// Persist the directory entry of a completed rename
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| write_err(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

fn write_err(path: &Path, source: io::Error) -> PipelineError {
    PipelineError::ArtifactWrite {
        path: path.to_path_buf(),
        source,
    }
}
