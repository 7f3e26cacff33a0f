//! Compiled numeric module tier.
//!
//! The artifact is a WebAssembly binary exposing `allocate`/`deallocate`
//! plus one entry point per supported algorithm (`ordered_dither`,
//! `floyd_steinberg_dither`, `atkinson_dither`, `halftone_dither`), all
//! operating on grayscale buffers in module memory.
//!
//! Every invocation follows a strict allocate -> write -> call -> read ->
//! deallocate contract against a fresh store and instance; nothing is
//! pooled between calls, so there is no cross-call aliasing to reason
//! about, at the cost of per-call allocation.
//!
//! Loading is explicit state, not a module global: the backend owns its
//! artifact URL, retry budget and load state. The artifact is fetched at
//! most once per session, retried with exponential backoff, optionally
//! cached on disk, and a load that exhausts its retry budget marks the
//! tier unavailable for the rest of the session.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use dither_core::{intensity, Algorithm, ColorMode};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::error::{BackendError, ModuleError};

use super::{ChunkBackend, ChunkInput, Tier};

/// Where and how to load the compiled module artifact.
#[derive(Debug, Clone)]
pub struct ModuleConfig {
    /// URL of the compiled artifact.
    pub artifact_url: String,
    /// Optional on-disk cache file. Read before fetching; written after a
    /// successful fetch, so later sessions skip the network entirely.
    pub cache_path: Option<PathBuf>,
    /// Maximum load attempts before the tier is marked unavailable.
    pub max_attempts: u32,
    /// Base delay of the exponential backoff (1x, 2x, ... between
    /// attempts).
    pub retry_base: Duration,
}

impl ModuleConfig {
    pub fn new(artifact_url: impl Into<String>) -> Self {
        Self {
            artifact_url: artifact_url.into(),
            cache_path: None,
            max_attempts: 3,
            retry_base: Duration::from_secs(1),
        }
    }

    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }
}

/// Load lifecycle of the module tier.
enum LoadState {
    /// Not attempted yet.
    Unloaded,
    /// Compiled and ready for per-call instantiation.
    Loaded(wasmtime::Module),
    /// Retry budget exhausted; permanently unavailable this session.
    Unavailable { attempts: u32 },
}

/// The compiled-module execution tier.
pub struct ModuleBackend {
    config: ModuleConfig,
    engine: wasmtime::Engine,
    state: Mutex<LoadState>,
    /// Serializes load attempts so concurrent jobs trigger one fetch.
    load_guard: AsyncMutex<()>,
}

impl ModuleBackend {
    pub fn new(config: ModuleConfig) -> Self {
        Self {
            config,
            engine: wasmtime::Engine::default(),
            state: Mutex::new(LoadState::Unloaded),
            load_guard: AsyncMutex::new(()),
        }
    }

    /// Whether the artifact is compiled and ready.
    pub fn is_loaded(&self) -> bool {
        matches!(*self.state.lock().unwrap(), LoadState::Loaded(_))
    }

    /// Ensure the artifact is loaded, fetching it if necessary.
    ///
    /// Fetch and compile failures both count against the retry budget;
    /// exhausting it transitions to `Unavailable` for the rest of the
    /// session and every later call fails fast with the same error.
    pub async fn ensure_loaded(&self) -> Result<(), ModuleError> {
        let _guard = self.load_guard.lock().await;

        match &*self.state.lock().unwrap() {
            LoadState::Loaded(_) => return Ok(()),
            LoadState::Unavailable { attempts } => {
                return Err(ModuleError::Unavailable {
                    attempts: *attempts,
                })
            }
            LoadState::Unloaded => {}
        }

        let mut last_error = ModuleError::Fetch("no attempts made".into());
        for attempt in 1..=self.config.max_attempts {
            match self.try_load_once().await {
                Ok(module) => {
                    info!(attempt, "compiled module loaded");
                    *self.state.lock().unwrap() = LoadState::Loaded(module);
                    return Ok(());
                }
                Err(err) => {
                    warn!(attempt, error = %err, "module load attempt failed");
                    last_error = err;
                    if attempt < self.config.max_attempts {
                        // 1x, 2x, 4x... the base delay between attempts
                        let delay = self.config.retry_base * (1 << (attempt - 1));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        warn!(
            attempts = self.config.max_attempts,
            "module tier marked unavailable for this session"
        );
        *self.state.lock().unwrap() = LoadState::Unavailable {
            attempts: self.config.max_attempts,
        };
        Err(last_error)
    }

    /// One fetch + compile attempt, consulting the disk cache first.
    async fn try_load_once(&self) -> Result<wasmtime::Module, ModuleError> {
        if let Some(cache) = &self.config.cache_path {
            if let Ok(bytes) = tokio::fs::read(cache).await {
                debug!(path = %cache.display(), "module artifact found in cache");
                match wasmtime::Module::new(&self.engine, &bytes) {
                    Ok(module) => return Ok(module),
                    Err(err) => {
                        // A stale or corrupt cache entry falls through to a
                        // fresh fetch rather than failing the attempt.
                        warn!(error = %err, "cached module artifact invalid; refetching");
                    }
                }
            }
        }

        let response = reqwest::get(&self.config.artifact_url)
            .await
            .map_err(|e| ModuleError::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| ModuleError::Fetch(e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ModuleError::Fetch(e.to_string()))?;

        let module = wasmtime::Module::new(&self.engine, &bytes)
            .map_err(|e| ModuleError::Invalid(e.to_string()))?;

        if let Some(cache) = &self.config.cache_path {
            if let Err(err) = tokio::fs::write(cache, &bytes).await {
                warn!(error = %err, "failed to write module cache");
            }
        }
        Ok(module)
    }

    /// Run one algorithm call under the allocate/use/free contract.
    fn invoke(
        &self,
        algorithm: &Algorithm,
        gray: &[u8],
        width: usize,
        height: usize,
    ) -> Result<Vec<u8>, ModuleError> {
        let module = match &*self.state.lock().unwrap() {
            LoadState::Loaded(module) => module.clone(),
            LoadState::Unavailable { attempts } => {
                return Err(ModuleError::Unavailable {
                    attempts: *attempts,
                })
            }
            LoadState::Unloaded => return Err(ModuleError::NotLoaded),
        };

        let mut store = wasmtime::Store::new(&self.engine, ());
        let instance = wasmtime::Instance::new(&mut store, &module, &[])
            .map_err(|e| ModuleError::Invalid(e.to_string()))?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or(ModuleError::MissingExport("memory"))?;
        let allocate = instance
            .get_typed_func::<i32, i32>(&mut store, "allocate")
            .map_err(|_| ModuleError::MissingExport("allocate"))?;
        let deallocate = instance
            .get_typed_func::<(i32, i32), ()>(&mut store, "deallocate")
            .map_err(|_| ModuleError::MissingExport("deallocate"))?;

        let len = (width * height) as i32;

        // allocate
        let input_ptr = allocate
            .call(&mut store, len)
            .map_err(|e| ModuleError::Call(e.to_string()))?;
        let output_ptr = allocate
            .call(&mut store, len)
            .map_err(|e| ModuleError::Call(e.to_string()))?;

        // write
        memory
            .write(&mut store, input_ptr as usize, gray)
            .map_err(|e| ModuleError::Call(e.to_string()))?;

        // invoke
        let w = width as i32;
        let h = height as i32;
        match *algorithm {
            Algorithm::Ordered { dot_size, .. } => {
                let f = instance
                    .get_typed_func::<(i32, i32, i32, i32, i32), ()>(&mut store, "ordered_dither")
                    .map_err(|_| ModuleError::MissingExport("ordered_dither"))?;
                f.call(&mut store, (input_ptr, w, h, dot_size.max(1) as i32, output_ptr))
                    .map_err(|e| ModuleError::Call(e.to_string()))?;
            }
            Algorithm::FloydSteinberg { threshold } => {
                let f = instance
                    .get_typed_func::<(i32, i32, i32, i32, i32), ()>(
                        &mut store,
                        "floyd_steinberg_dither",
                    )
                    .map_err(|_| ModuleError::MissingExport("floyd_steinberg_dither"))?;
                f.call(&mut store, (input_ptr, w, h, i32::from(threshold), output_ptr))
                    .map_err(|e| ModuleError::Call(e.to_string()))?;
            }
            Algorithm::Atkinson { threshold } => {
                let f = instance
                    .get_typed_func::<(i32, i32, i32, i32, i32), ()>(&mut store, "atkinson_dither")
                    .map_err(|_| ModuleError::MissingExport("atkinson_dither"))?;
                f.call(&mut store, (input_ptr, w, h, i32::from(threshold), output_ptr))
                    .map_err(|e| ModuleError::Call(e.to_string()))?;
            }
            Algorithm::Halftone {
                dot_size,
                spacing,
                angle,
            } => {
                let f = instance
                    .get_typed_func::<(i32, i32, i32, i32, i32, f32, i32), ()>(
                        &mut store,
                        "halftone_dither",
                    )
                    .map_err(|_| ModuleError::MissingExport("halftone_dither"))?;
                f.call(
                    &mut store,
                    (
                        input_ptr,
                        w,
                        h,
                        dot_size as i32,
                        spacing as i32,
                        angle,
                        output_ptr,
                    ),
                )
                .map_err(|e| ModuleError::Call(e.to_string()))?;
            }
            _ => return Err(ModuleError::Call("algorithm not in module ABI".into())),
        }

        // read
        let mut out = vec![0u8; width * height];
        memory
            .read(&store, output_ptr as usize, &mut out)
            .map_err(|e| ModuleError::Call(e.to_string()))?;

        // free
        deallocate
            .call(&mut store, (input_ptr, len))
            .map_err(|e| ModuleError::Call(e.to_string()))?;
        deallocate
            .call(&mut store, (output_ptr, len))
            .map_err(|e| ModuleError::Call(e.to_string()))?;

        Ok(out)
    }
}

impl ChunkBackend for ModuleBackend {
    fn tier(&self) -> Tier {
        Tier::Module
    }

    /// The module ABI covers the monochrome runs of four algorithms.
    fn supports(&self, algorithm: &Algorithm, color_mode: &ColorMode) -> bool {
        color_mode.is_monochrome()
            && matches!(
                algorithm,
                Algorithm::Ordered { .. }
                    | Algorithm::FloydSteinberg { .. }
                    | Algorithm::Atkinson { .. }
                    | Algorithm::Halftone { .. }
            )
    }

    fn process_chunk(&self, input: &ChunkInput<'_>) -> Result<Vec<u8>, BackendError> {
        let gray_out = self.invoke(
            &input.options.algorithm,
            input.gray,
            input.width,
            input.height,
        )?;
        Ok(intensity::gray_to_rgba(&gray_out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_matches_module_abi() {
        let backend = ModuleBackend::new(ModuleConfig::new("http://localhost/none.wasm"));
        assert!(backend.supports(&Algorithm::ordered(), &ColorMode::Grayscale));
        assert!(backend.supports(&Algorithm::atkinson(), &ColorMode::Grayscale));
        assert!(!backend.supports(&Algorithm::ordered(), &ColorMode::Rgb));
        assert!(!backend.supports(
            &Algorithm::Riemersma { threshold: 128 },
            &ColorMode::Grayscale
        ));
    }

    #[test]
    fn test_invoke_before_load_fails_fast() {
        let backend = ModuleBackend::new(ModuleConfig::new("http://localhost/none.wasm"));
        let err = backend
            .invoke(&Algorithm::ordered(), &[0u8; 4], 2, 2)
            .unwrap_err();
        assert!(matches!(err, ModuleError::NotLoaded));
    }
}
