//! In-process Rego evaluation with `regorus`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::info;

use super::{PolicyClient, PolicyError, defined_or_empty};

/// Policies parsed once at startup and evaluated on the blocking pool.
///
/// Each query runs on its own clone of the loaded engine, so input set by one
/// request is never visible to another.
#[derive(Debug, Clone)]
pub struct RegoPolicy {
    engine: Arc<Mutex<regorus::Engine>>,
}

impl RegoPolicy {
    /// Load `.rego` files; directories are walked recursively.
    pub fn from_paths(paths: &[PathBuf]) -> Result<Self, PolicyError> {
        let mut files = Vec::new();
        for path in paths {
            let before = files.len();
            collect_rego_files(path, &mut files)?;
            if files.len() == before {
                return Err(PolicyError::NoPolicies(path.display().to_string()));
            }
        }

        let mut sources = Vec::with_capacity(files.len());
        for file in files {
            let source = std::fs::read_to_string(&file).map_err(|e| PolicyError::Load {
                path: file.display().to_string(),
                reason: e.to_string(),
            })?;
            sources.push((file.display().to_string(), source));
        }

        Self::from_sources(sources)
    }

    /// Build from in-memory sources, `(name, rego)` pairs.
    ///
    /// Syntax errors surface here, not on the first request.
    pub fn from_sources<I, N, S>(sources: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        let mut engine = regorus::Engine::new();
        let mut loaded = 0usize;
        for (path, source) in sources {
            let path = path.into();
            engine
                .add_policy(path.clone(), source.into())
                .map_err(|e| PolicyError::Load {
                    path,
                    reason: e.to_string(),
                })?;
            loaded += 1;
        }
        info!(modules = loaded, "policy loaded");

        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
        })
    }

    fn engine(&self) -> regorus::Engine {
        self.engine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn collect_rego_files(path: &Path, out: &mut Vec<PathBuf>) -> Result<(), PolicyError> {
    let load_err = |e: std::io::Error| PolicyError::Load {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    if path.is_dir() {
        let mut entries = std::fs::read_dir(path)
            .map_err(load_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(load_err)?;
        entries.sort_by_key(|e| e.path());

        for entry in entries {
            let child = entry.path();
            if child.is_dir() {
                collect_rego_files(&child, out)?;
            } else if child.extension().is_some_and(|ext| ext == "rego") {
                out.push(child);
            }
        }
        Ok(())
    } else if path.is_file() {
        out.push(path.to_path_buf());
        Ok(())
    } else {
        Err(PolicyError::Load {
            path: path.display().to_string(),
            reason: "no such file or directory".into(),
        })
    }
}

fn evaluate(
    mut engine: regorus::Engine,
    query: &str,
    input: &serde_json::Value,
) -> Result<serde_json::Value, PolicyError> {
    let eval_err = |reason: String| PolicyError::Eval {
        query: query.to_string(),
        reason,
    };

    let input = regorus::Value::from_json_str(&input.to_string()).map_err(|e| eval_err(e.to_string()))?;
    engine.set_input(input);

    let results = engine
        .eval_query(query.to_string(), false)
        .map_err(|e| eval_err(e.to_string()))?;

    let Some(value) = results
        .result
        .into_iter()
        .next()
        .and_then(|r| r.expressions.into_iter().next())
        .map(|expr| expr.value)
        .filter(|value| *value != regorus::Value::Undefined)
    else {
        return Ok(defined_or_empty(serde_json::Value::Null));
    };

    let value = serde_json::to_value(&value).map_err(|e| eval_err(e.to_string()))?;
    Ok(defined_or_empty(value))
}

#[async_trait]
impl PolicyClient for RegoPolicy {
    async fn query(
        &self,
        query: &str,
        input: &serde_json::Value,
    ) -> Result<serde_json::Value, PolicyError> {
        let engine = self.engine();
        let owned_query = query.to_string();
        let input = input.clone();

        tokio::task::spawn_blocking(move || evaluate(engine, &owned_query, &input))
            .await
            .map_err(|e| PolicyError::Eval {
                query: query.to_string(),
                reason: e.to_string(),
            })?
    }
}
