use ndarray::Array4;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Model not available")]
    Unavailable,
    #[error("Model error: {0}")]
    Model(String),
    #[error("Model returned {actual} scores, expected {expected}")]
    OutputSize { expected: usize, actual: usize },
    #[error("Model score {value} at index {index} is not a probability")]
    NotAProbability { index: usize, value: f32 },
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Model artifact not found at {0}")]
    NotFound(String),
    #[error("Failed to load model: {0}")]
    Backend(String),
    #[error("Model has {outputs} outputs but the label set has {labels} entries")]
    LabelMismatch { outputs: usize, labels: usize },
    #[error("Server was built without the `torch` feature")]
    BackendDisabled,
}

/// How the model artifact is driven.
#[derive(Debug, Clone, Copy)]
pub struct ModelOptions {
    pub apply_softmax: bool,
    pub input_width: u32,
    pub input_height: u32,
}

/// Anything that maps a normalized `(1, H, W, 3)` batch to one score per class.
pub trait Classifier: Send + Sync {
    fn num_classes(&self) -> usize;
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}

/// Process-wide handle to the loaded classifier. When loading failed the
/// gateway stays up in an unavailable state and every call reports it.
#[derive(Clone)]
pub struct InferenceGateway {
    classifier: Option<Arc<dyn Classifier>>,
    num_labels: usize,
}

impl InferenceGateway {
    /// Checks the classifier's output width against the label set.
    pub fn new(classifier: Arc<dyn Classifier>, num_labels: usize) -> Result<Self, LoadError> {
        let outputs = classifier.num_classes();
        if outputs != num_labels {
            return Err(LoadError::LabelMismatch {
                outputs,
                labels: num_labels,
            });
        }
        Ok(Self {
            classifier: Some(classifier),
            num_labels,
        })
    }

    pub fn unavailable(num_labels: usize) -> Self {
        Self {
            classifier: None,
            num_labels,
        }
    }

    /// Loads the model artifact, falling back to an unavailable gateway on any error.
    pub fn load(model_path: &Path, num_labels: usize, options: &ModelOptions) -> Self {
        let loaded = load_classifier(model_path, options)
            .and_then(|classifier| Self::new(classifier, num_labels));
        match loaded {
            Ok(gateway) => {
                log::info!(
                    "Loaded model from {} ({} classes)",
                    model_path.display(),
                    num_labels
                );
                gateway
            }
            Err(e) => {
                log::error!("Failed to load model from {}: {}", model_path.display(), e);
                Self::unavailable(num_labels)
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn inference(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let classifier = self.classifier.as_ref().ok_or(InferenceError::Unavailable)?;
        let scores = classifier.predict(input)?;
        if scores.len() != self.num_labels {
            return Err(InferenceError::OutputSize {
                expected: self.num_labels,
                actual: scores.len(),
            });
        }
        // Raw logits would otherwise surface as confidences above 1.
        if let Some((index, &value)) = scores
            .iter()
            .enumerate()
            .find(|(_, p)| !(0.0..=1.0).contains(*p))
        {
            return Err(InferenceError::NotAProbability { index, value });
        }
        Ok(scores)
    }
}

#[cfg(feature = "torch")]
fn load_classifier(
    model_path: &Path,
    options: &ModelOptions,
) -> Result<Arc<dyn Classifier>, LoadError> {
    if !model_path.exists() {
        return Err(LoadError::NotFound(model_path.display().to_string()));
    }
    let classifier = torch::TorchClassifier::load(model_path, options)?;
    Ok(Arc::new(classifier))
}

#[cfg(not(feature = "torch"))]
fn load_classifier(
    model_path: &Path,
    _options: &ModelOptions,
) -> Result<Arc<dyn Classifier>, LoadError> {
    if !model_path.exists() {
        return Err(LoadError::NotFound(model_path.display().to_string()));
    }
    Err(LoadError::BackendDisabled)
}

#[cfg(feature = "torch")]
mod torch {
    use super::{Classifier, InferenceError, LoadError, ModelOptions};
    use ndarray::Array4;
    use std::path::Path;
    use std::sync::Mutex;
    use tch::{CModule, Device, Kind, Tensor};

    /// TorchScript classifier. Expects NCHW float input, so the NHWC batch is permuted.
    pub struct TorchClassifier {
        model: Mutex<CModule>,
        device: Device,
        num_classes: usize,
        apply_softmax: bool,
    }

    impl TorchClassifier {
        pub fn load(model_path: &Path, options: &ModelOptions) -> Result<Self, LoadError> {
            let device = Device::cuda_if_available();
            let mut model = CModule::load_on_device(model_path, device)
                .map_err(|e| LoadError::Backend(e.to_string()))?;
            model.set_eval();

            let mut classifier = Self {
                model: Mutex::new(model),
                device,
                num_classes: 0,
                apply_softmax: options.apply_softmax,
            };

            // Probe the output width once so it can be checked against the label set.
            let probe = Array4::<f32>::zeros((
                1,
                options.input_height as usize,
                options.input_width as usize,
                3,
            ));
            let scores = classifier
                .forward(&probe)
                .map_err(|e| LoadError::Backend(e.to_string()))?;
            classifier.num_classes = scores.len();
            Ok(classifier)
        }

        fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            let shape: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
            let data = input
                .as_slice()
                .ok_or_else(|| InferenceError::Model("input batch is not contiguous".into()))?;
            let tensor = Tensor::from_slice(data)
                .view(shape.as_slice())
                .permute([0, 3, 1, 2])
                .to_device(self.device);

            let model = self
                .model
                .lock()
                .map_err(|_| InferenceError::Model("model lock poisoned".into()))?;
            let output = tch::no_grad(|| model.forward_ts(&[tensor]))
                .map_err(|e| InferenceError::Model(e.to_string()))?;

            let output = if self.apply_softmax {
                output.softmax(-1, Kind::Float)
            } else {
                output.to_kind(Kind::Float)
            };
            let output = output.to_device(Device::Cpu).view([-1]);
            Vec::<f32>::try_from(&output).map_err(|e| InferenceError::Model(e.to_string()))
        }
    }

    impl Classifier for TorchClassifier {
        fn num_classes(&self) -> usize {
            self.num_classes
        }

        fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            self.forward(input)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) struct FixedClassifier(pub Vec<f32>);

    impl Classifier for FixedClassifier {
        fn num_classes(&self) -> usize {
            self.0.len()
        }

        fn predict(&self, _input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            Ok(self.0.clone())
        }
    }

    /// Claims `n` classes and fails every prediction.
    pub(crate) struct FailingClassifier(pub usize);

    impl Classifier for FailingClassifier {
        fn num_classes(&self) -> usize {
            self.0
        }

        fn predict(&self, _input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            Err(InferenceError::Model("boom".into()))
        }
    }

    fn batch() -> Array4<f32> {
        Array4::zeros((1, 4, 4, 3))
    }

    #[test]
    fn label_count_mismatch_is_rejected() {
        let err = InferenceGateway::new(Arc::new(FixedClassifier(vec![0.5, 0.5])), 3)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            LoadError::LabelMismatch {
                outputs: 2,
                labels: 3
            }
        ));
    }

    #[test]
    fn unavailable_gateway_reports_unavailable() {
        let gateway = InferenceGateway::unavailable(3);
        assert!(!gateway.is_available());
        assert!(matches!(
            gateway.inference(&batch()),
            Err(InferenceError::Unavailable)
        ));
    }

    #[test]
    fn missing_artifact_yields_unavailable_gateway() {
        let options = ModelOptions {
            apply_softmax: true,
            input_width: 4,
            input_height: 4,
        };
        let gateway = InferenceGateway::load(Path::new("/nonexistent/model.pt"), 3, &options);
        assert!(!gateway.is_available());
    }

    #[test]
    fn scores_pass_through_and_errors_propagate() {
        let gateway = InferenceGateway::new(Arc::new(FixedClassifier(vec![0.2, 0.8])), 2).unwrap();
        assert_eq!(gateway.inference(&batch()).unwrap(), vec![0.2, 0.8]);

        let failing = InferenceGateway::new(Arc::new(FailingClassifier(2)), 2).unwrap();
        assert!(matches!(
            failing.inference(&batch()),
            Err(InferenceError::Model(_))
        ));
    }

    #[test]
    fn scores_outside_unit_interval_are_rejected() {
        let logits = InferenceGateway::new(Arc::new(FixedClassifier(vec![-2.0, 7.5])), 2).unwrap();
        assert!(matches!(
            logits.inference(&batch()),
            Err(InferenceError::NotAProbability { index: 0, .. })
        ));

        let nan = InferenceGateway::new(Arc::new(FixedClassifier(vec![0.1, f32::NAN])), 2).unwrap();
        assert!(matches!(
            nan.inference(&batch()),
            Err(InferenceError::NotAProbability { index: 1, .. })
        ));

        let edges = InferenceGateway::new(Arc::new(FixedClassifier(vec![0.0, 1.0])), 2).unwrap();
        assert_eq!(edges.inference(&batch()).unwrap(), vec![0.0, 1.0]);
    }
}
