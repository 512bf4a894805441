//! ONNX Runtime session loading and inference.
//!
//! Wraps an ort Session together with its discovered input/output names so
//! model wrappers only deal with tensors.

use std::path::Path;
use std::sync::Mutex;

use ndarray::ArrayD;
use ort::execution_providers::{CPUExecutionProvider, ExecutionProviderDispatch};
use ort::session::Session;
use ort::session::builder::{GraphOptimizationLevel as GOL, SessionBuilder};
use ort::value::Value;
use tracing::debug;

use crate::core::config::{
    OrtExecutionProvider, OrtGraphOptimizationLevel as OG, OrtSessionConfig,
};
use crate::core::errors::{OCRError, OcrResult};
use crate::core::Tensor4D;

/// An ONNX Runtime session with its input/output names resolved.
///
/// The session is kept behind a mutex because ort requires exclusive access
/// to run inference. Model weights themselves are immutable after loading.
pub struct OrtInfer {
    session: Mutex<Session>,
    model_name: String,
    input_name: String,
    output_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("model_name", &self.model_name)
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .finish_non_exhaustive()
    }
}

impl OrtInfer {
    /// Loads an ONNX model from a file and resolves its input/output names.
    ///
    /// # Arguments
    ///
    /// * `model_path` - Path to the .onnx file.
    /// * `config` - Session configuration (threads, optimization, providers).
    /// * `model_name` - Name used in logs and error messages.
    pub fn from_file(
        model_path: &Path,
        config: &OrtSessionConfig,
        model_name: &str,
    ) -> OcrResult<Self> {
        if !model_path.exists() {
            return Err(OCRError::model_not_found(model_path.display().to_string()));
        }

        let builder = Session::builder()?;
        let builder = Self::apply_ort_config(builder, config)?;
        let session = builder.commit_from_file(model_path).map_err(|e| {
            OCRError::model_load_failed(
                model_path.display().to_string(),
                "session creation failed",
                e,
            )
        })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| {
                OCRError::model_load_failed(
                    model_path.display().to_string(),
                    "model declares no inputs",
                    ort::Error::new("empty input list"),
                )
            })?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| {
                OCRError::model_load_failed(
                    model_path.display().to_string(),
                    "model declares no outputs",
                    ort::Error::new("empty output list"),
                )
            })?;

        debug!(
            model = model_name,
            input = %input_name,
            output = %output_name,
            intra_threads = config.get_intra_threads(),
            "ONNX session created"
        );

        Ok(Self {
            session: Mutex::new(session),
            model_name: model_name.to_string(),
            input_name,
            output_name,
        })
    }

    /// Name used in logs and error messages.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Runs the model on a single NCHW tensor and returns the first output.
    pub fn run(&self, input: Tensor4D) -> OcrResult<ArrayD<f32>> {
        let input_shape = input.shape().to_vec();
        // A poisoned lock only means another thread panicked mid-run; the
        // session handle itself is still usable.
        let mut session = self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let input_value = Value::from_array(input).map_err(|e| {
            OCRError::inference_error(
                &self.model_name,
                format!("failed to create input tensor with shape {input_shape:?}"),
                e,
            )
        })?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .map_err(|e| {
                OCRError::inference_error(
                    &self.model_name,
                    format!("forward pass failed for input shape {input_shape:?}"),
                    e,
                )
            })?;

        let output = outputs[0].try_extract_array::<f32>().map_err(|e| {
            OCRError::inference_error(
                &self.model_name,
                format!("failed to extract output '{}'", self.output_name),
                e,
            )
        })?;

        Ok(output.to_owned())
    }

    fn apply_ort_config(
        mut builder: SessionBuilder,
        cfg: &OrtSessionConfig,
    ) -> Result<SessionBuilder, ort::Error> {
        if let Some(intra) = cfg.intra_threads {
            builder = builder.with_intra_threads(intra)?;
        }
        if let Some(inter) = cfg.inter_threads {
            builder = builder.with_inter_threads(inter)?;
        }
        if let Some(par) = cfg.parallel_execution {
            builder = builder.with_parallel_execution(par)?;
        }
        if let Some(level) = cfg.optimization_level {
            let mapped = match level {
                OG::DisableAll => GOL::Disable,
                OG::Level1 => GOL::Level1,
                OG::Level2 => GOL::Level2,
                OG::Level3 => GOL::Level3,
                // ONNX Runtime exposes no separate level above Level3.
                OG::All => GOL::Level3,
            };
            builder = builder.with_optimization_level(mapped)?;
        }
        if let Some(enable) = cfg.enable_mem_pattern {
            builder = builder.with_memory_pattern(enable)?;
        }
        let providers = Self::build_execution_providers(&cfg.get_execution_providers())?;
        if !providers.is_empty() {
            builder = builder.with_execution_providers(providers)?;
        }
        Ok(builder)
    }

    fn build_execution_providers(
        eps: &[OrtExecutionProvider],
    ) -> Result<Vec<ExecutionProviderDispatch>, ort::Error> {
        use crate::core::config::OrtExecutionProvider as EP;
        let mut providers = Vec::new();

        for ep in eps {
            match ep {
                EP::CPU => {
                    providers.push(CPUExecutionProvider::default().build());
                }
                #[cfg(feature = "cuda")]
                EP::CUDA { device_id } => {
                    let mut cuda_provider =
                        ort::execution_providers::CUDAExecutionProvider::default();
                    if let Some(id) = device_id {
                        cuda_provider = cuda_provider.with_device_id(*id);
                    }
                    providers.push(cuda_provider.build());
                }
                #[cfg(not(feature = "cuda"))]
                EP::CUDA { .. } => {
                    return Err(ort::Error::new(
                        "CUDA execution provider requested but cuda feature is not enabled",
                    ));
                }
            }
        }

        Ok(providers)
    }
}
