// src/classify/http.rs
//! Remote inference endpoint (text-classification server hosting the model).
//!
//! Request:  `{"model": "...", "inputs": [..]}` where inputs are strings or
//!           `{input_ids, attention_mask}` objects.
//! Response: `[{"label": "Bullish", "score": 0.93}, ...]`, one per input.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Batch, Classifier, Prediction};
use crate::model::Label;

pub struct HttpClassifier {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

impl HttpClassifier {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("crypto-sentiment/0.1")
            .connect_timeout(Duration::from_secs(4).min(timeout))
            .timeout(timeout)
            .build()
            .context("building inference http client")?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
        })
    }
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    inputs: &'a Batch,
}

#[derive(Deserialize)]
struct RemotePrediction {
    label: String,
    score: f64,
}

/// Map the server's answer onto predictions, enforcing one-per-input.
fn into_predictions(expected: usize, body: Vec<RemotePrediction>) -> Result<Vec<Prediction>> {
    if body.len() != expected {
        bail!(
            "inference endpoint returned {} predictions for {} inputs",
            body.len(),
            expected
        );
    }
    body.into_iter()
        .map(|p| {
            let label = Label::parse(&p.label)
                .ok_or_else(|| anyhow!("unknown label from inference endpoint: {:?}", p.label))?;
            Ok(Prediction::new(label, p.score))
        })
        .collect()
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, batch: Batch) -> Result<Vec<Prediction>> {
        let req = Req {
            model: &self.model,
            inputs: &batch,
        };
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&req)
            .send()
            .await
            .with_context(|| format!("POST {}", self.endpoint))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("inference endpoint answered {status}");
        }
        let body: Vec<RemotePrediction> = resp
            .json()
            .await
            .context("decoding inference response")?;
        into_predictions(batch.len(), body)
    }

    fn profile(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rp(label: &str, score: f64) -> RemotePrediction {
        RemotePrediction {
            label: label.to_string(),
            score,
        }
    }

    #[test]
    fn maps_labels_and_clamps_scores() {
        let out = into_predictions(2, vec![rp("positive", 1.3), rp("Bearish", 0.6)]).unwrap();
        assert_eq!(out[0], Prediction::new(Label::Bullish, 1.0));
        assert_eq!(out[1].label, Label::Bearish);
    }

    #[test]
    fn count_mismatch_is_an_error() {
        assert!(into_predictions(3, vec![rp("Neutral", 0.5)]).is_err());
    }

    #[test]
    fn unknown_label_is_an_error() {
        assert!(into_predictions(1, vec![rp("LABEL_0", 0.5)]).is_err());
    }
}
