use crate::{Backend, Device, InferError, ModelSource, Session, TensorValue};
use base::Tensor;
use ndarray::ArrayViewD;
use ort::session::{Session as OrtSession, SessionInputValue};
use ort::value::Tensor as OrtTensor;
use std::collections::HashMap;
use std::sync::OnceLock;

static ORT_INIT: OnceLock<()> = OnceLock::new();

fn ensure_ort_init() {
    ORT_INIT.get_or_init(|| {
        let _ = ort::init().commit();
    });
}

pub struct OnnxBackend {
    device: Device,
}

impl OnnxBackend {
    pub fn new(device: Device) -> Self {
        ensure_ort_init();
        Self { device }
    }
}

impl Backend for OnnxBackend {
    fn name(&self) -> &str {
        "onnx"
    }

    fn load_model(&self, model: ModelSource) -> Result<Box<dyn Session>, InferError> {
        let mut builder = OrtSession::builder()
            .map_err(|e| InferError::Backend(format!("failed to create session builder: {e}")))?;

        builder = match &self.device {
            Device::Cpu => builder
                .with_execution_providers([ort::ep::CPU::default().build()])
                .map_err(|_| InferError::UnsupportedDevice(self.device.clone()))?,
            #[cfg(feature = "cuda")]
            Device::Cuda { device_id } => builder
                .with_execution_providers([
                    ort::ep::CUDA::default().with_device_id(*device_id).build(),
                    ort::ep::CPU::default().build(),
                ])
                .map_err(|_| InferError::UnsupportedDevice(self.device.clone()))?,
            #[cfg(not(feature = "cuda"))]
            Device::Cuda { .. } => {
                return Err(InferError::UnsupportedDevice(self.device.clone()));
            }
        };

        let session = match model {
            ModelSource::File(path) => builder.commit_from_file(path).map_err(|e| {
                InferError::ModelLoad(format!("failed to load model from file: {e}"))
            })?,
            ModelSource::Memory(bytes) => builder.commit_from_memory(&bytes).map_err(|e| {
                InferError::ModelLoad(format!("failed to load model from memory: {e}"))
            })?,
        };

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|input| input.name().to_string())
            .collect();
        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|output| output.name().to_string())
            .collect();

        Ok(Box::new(OnnxSession {
            session,
            input_names,
            output_names,
        }))
    }
}

pub struct OnnxSession {
    session: OrtSession,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl Session for OnnxSession {
    fn run(
        &mut self,
        inputs: &[(&str, TensorValue)],
    ) -> Result<HashMap<String, Tensor<f32>>, InferError> {
        for (name, _) in inputs {
            if !self.input_names.iter().any(|n| n == name) {
                return Err(InferError::InvalidInput {
                    name: name.to_string(),
                    expected_names: self.input_names.clone(),
                });
            }
        }

        let mut ort_inputs: Vec<(String, SessionInputValue<'_>)> =
            Vec::with_capacity(inputs.len());
        for (name, value) in inputs {
            let input_value = match value {
                TensorValue::F32(t) => SessionInputValue::from(
                    OrtTensor::from_array((t.shape.clone(), t.data.clone()))
                        .map_err(|e| InferError::Backend(format!("input '{name}': {e}")))?,
                ),
                TensorValue::I64(t) => SessionInputValue::from(
                    OrtTensor::from_array((t.shape.clone(), t.data.clone()))
                        .map_err(|e| InferError::Backend(format!("input '{name}': {e}")))?,
                ),
                TensorValue::Bool(t) => SessionInputValue::from(
                    OrtTensor::from_array((t.shape.clone(), t.data.clone()))
                        .map_err(|e| InferError::Backend(format!("input '{name}': {e}")))?,
                ),
            };
            ort_inputs.push((name.to_string(), input_value));
        }

        let outputs = self
            .session
            .run(ort_inputs)
            .map_err(|e| InferError::Backend(format!("inference failed: {e}")))?;

        let mut result = HashMap::new();
        for output_name in &self.output_names {
            let value = outputs.get(output_name.as_str()).ok_or_else(|| {
                InferError::Backend(format!("model did not produce output '{output_name}'"))
            })?;
            let array = value.try_extract_array::<f32>().map_err(|e| {
                InferError::Backend(format!("output '{output_name}' is not f32: {e}"))
            })?;
            result.insert(output_name.clone(), ndarray_to_tensor(array)?);
        }

        Ok(result)
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }

    fn metadata_value(&self, key: &str) -> Option<String> {
        self.session
            .metadata()
            .ok()
            .and_then(|metadata| metadata.custom(key))
    }
}

fn ndarray_to_tensor(array: ArrayViewD<'_, f32>) -> Result<Tensor<f32>, InferError> {
    let shape = array.shape().to_vec();
    let data = array.iter().copied().collect();
    Tensor::new(shape, data).map_err(|e| InferError::Shape(e.to_string()))
}
