use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::activation::activation::Activation;
use crate::config::Hyperparams;
use crate::error::{Error, Result};
use crate::layers::dense::Layer;
use crate::math::matrix::Matrix;
use crate::network::network::Network;

/// One layer of the persisted model document.
///
/// Fields:
/// - `inputs`:     width feeding into this layer
/// - `outputs`:    width this layer produces
/// - `activation`: lowercase tag (`linear`, `sigmoid`, `softmax`)
/// - `weights`:    `outputs` rows of `inputs` values each
/// - `bias`:       `outputs` values
///
/// The shape fields are deliberately redundant with the payload so a
/// reader can validate a document before touching any numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerDoc {
    pub inputs: usize,
    pub outputs: usize,
    pub activation: String,
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

/// The persisted model: the formula it was trained with (if any), the
/// hyperparameters, and the ordered layer stack. Everything needed to
/// resume training on compatible data or to run inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDoc {
    pub formula: Option<String>,
    pub hyper: Hyperparams,
    pub layers: Vec<LayerDoc>,
}

impl ModelDoc {
    pub fn from_network(network: &Network) -> ModelDoc {
        let layers = network
            .layers
            .iter()
            .map(|layer| LayerDoc {
                inputs: layer.inputs,
                outputs: layer.outputs,
                activation: layer.activation.tag().to_string(),
                weights: layer.weights.data.clone(),
                bias: layer.bias.clone(),
            })
            .collect();
        ModelDoc {
            formula: network.formula().map(str::to_string),
            hyper: network.hyper(),
            layers,
        }
    }

    /// Validates the document and builds a live network from it. The
    /// result starts from `Phase::Uninitialized`: data must be bound
    /// before it can train again.
    pub fn into_network(self) -> Result<Network> {
        if self.layers.is_empty() {
            return Err(Error::CorruptModel("model document has no layers".into()));
        }

        let mut layers = Vec::with_capacity(self.layers.len());
        let mut previous_outputs: Option<usize> = None;
        for (i, doc) in self.layers.into_iter().enumerate() {
            if doc.inputs == 0 || doc.outputs == 0 {
                return Err(Error::CorruptModel(format!(
                    "layer {}: zero-width layer ({} inputs, {} outputs)",
                    i, doc.inputs, doc.outputs
                )));
            }
            if doc.weights.len() != doc.outputs {
                return Err(Error::CorruptModel(format!(
                    "layer {}: {} weight rows for {} outputs",
                    i,
                    doc.weights.len(),
                    doc.outputs
                )));
            }
            for (r, row) in doc.weights.iter().enumerate() {
                if row.len() != doc.inputs {
                    return Err(Error::CorruptModel(format!(
                        "layer {}: weight row {} has {} values, expected {}",
                        i,
                        r,
                        row.len(),
                        doc.inputs
                    )));
                }
            }
            if doc.bias.len() != doc.outputs {
                return Err(Error::CorruptModel(format!(
                    "layer {}: {} bias values for {} outputs",
                    i,
                    doc.bias.len(),
                    doc.outputs
                )));
            }
            if let Some(outputs) = previous_outputs {
                if doc.inputs != outputs {
                    return Err(Error::CorruptModel(format!(
                        "layer {}: {} inputs do not match the previous layer's {} outputs",
                        i, doc.inputs, outputs
                    )));
                }
            }
            let activation = Activation::from_tag(&doc.activation)
                .ok_or_else(|| Error::UnsupportedActivation {
                    tag: doc.activation.clone(),
                })?;

            previous_outputs = Some(doc.outputs);
            layers.push(Layer::from_parts(
                Matrix::from_data(doc.weights),
                doc.bias,
                activation,
            ));
        }

        Ok(Network::from_parts(layers, self.hyper, self.formula))
    }
}

/// Writes `network` to `path` as a YAML model document.
pub fn save_yaml<P: AsRef<Path>>(network: &Network, path: P) -> Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_yaml::to_writer(writer, &ModelDoc::from_network(network))?;
    Ok(())
}

/// Reads a YAML model document from `path` and reconstructs the network.
pub fn load_yaml<P: AsRef<Path>>(path: P) -> Result<Network> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let doc: ModelDoc = serde_yaml::from_reader(reader)?;
    doc.into_network()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_doc() -> ModelDoc {
        ModelDoc {
            formula: Some("y ~ *".to_string()),
            hyper: Hyperparams::default(),
            layers: vec![
                LayerDoc {
                    inputs: 2,
                    outputs: 3,
                    activation: "sigmoid".to_string(),
                    weights: vec![vec![0.1, 0.2], vec![0.3, 0.4], vec![0.5, 0.6]],
                    bias: vec![0.0, 0.1, 0.2],
                },
                LayerDoc {
                    inputs: 3,
                    outputs: 1,
                    activation: "linear".to_string(),
                    weights: vec![vec![1.0, -1.0, 0.5]],
                    bias: vec![0.25],
                },
            ],
        }
    }

    #[test]
    fn a_valid_document_builds_a_network() {
        let net = valid_doc().into_network().unwrap();
        assert_eq!(net.layers.len(), 2);
        assert_eq!(net.layers[0].activation, Activation::Sigmoid);
        assert_eq!(net.layers[1].weights.data, vec![vec![1.0, -1.0, 0.5]]);
        assert_eq!(net.formula(), Some("y ~ *"));
    }

    #[test]
    fn rejects_an_empty_layer_list() {
        let mut doc = valid_doc();
        doc.layers.clear();
        assert!(matches!(
            doc.into_network(),
            Err(Error::CorruptModel(_))
        ));
    }

    #[test]
    fn rejects_a_wrong_weight_row_count() {
        let mut doc = valid_doc();
        doc.layers[0].weights.pop();
        let err = doc.into_network().unwrap_err();
        match err {
            Error::CorruptModel(reason) => assert!(reason.contains("weight rows")),
            other => panic!("expected a corrupt-model error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_a_ragged_weight_row() {
        let mut doc = valid_doc();
        doc.layers[0].weights[1].push(9.0);
        let err = doc.into_network().unwrap_err();
        match err {
            Error::CorruptModel(reason) => assert!(reason.contains("row 1")),
            other => panic!("expected a corrupt-model error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_a_bias_length_mismatch() {
        let mut doc = valid_doc();
        doc.layers[1].bias.push(7.0);
        assert!(matches!(doc.into_network(), Err(Error::CorruptModel(_))));
    }

    #[test]
    fn rejects_broken_adjacency() {
        let mut doc = valid_doc();
        doc.layers[1].inputs = 4;
        doc.layers[1].weights = vec![vec![1.0, 2.0, 3.0, 4.0]];
        let err = doc.into_network().unwrap_err();
        match err {
            Error::CorruptModel(reason) => assert!(reason.contains("previous layer")),
            other => panic!("expected a corrupt-model error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_an_unknown_activation_tag() {
        let mut doc = valid_doc();
        doc.layers[0].activation = "relu".to_string();
        let err = doc.into_network().unwrap_err();
        match err {
            Error::UnsupportedActivation { tag } => assert_eq!(tag, "relu"),
            other => panic!("expected an unsupported-activation error, got {:?}", other),
        }
    }

    #[test]
    fn document_round_trips_through_yaml_text() {
        let doc = valid_doc();
        let text = serde_yaml::to_string(&doc).unwrap();
        let back: ModelDoc = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back.formula, doc.formula);
        assert_eq!(back.layers[0].weights, doc.layers[0].weights);
        assert_eq!(back.layers[1].bias, doc.layers[1].bias);
    }
}
