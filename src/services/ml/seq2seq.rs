//! Encoder-decoder summarizer on Candle
//!
//! Loads a T5-family checkpoint (`config.json`, `tokenizer.json` and
//! safetensors weights in one directory), encodes the prompt once and then
//! decodes token by token, releasing text through a [`TextStreamer`].

use super::source::{Fragment, FragmentStream, SummaryModel};
use super::text_streamer::TextStreamer;
use crate::types::{DecodingParams, GenerationRequest};
use anyhow::{anyhow, bail, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::t5;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

pub struct Seq2SeqSummarizer {
    model: t5::T5ForConditionalGeneration,
    tokenizer: Tokenizer,
    config: t5::Config,
    device: Device,
    name: String,
}

impl Seq2SeqSummarizer {
    pub fn load<P: AsRef<Path>>(model_dir: P, device: Device) -> Result<Self> {
        let dir = model_dir.as_ref();
        tracing::info!("[MODEL] Loading seq2seq checkpoint from {}", dir.display());

        let config_path = dir.join("config.json");
        let tokenizer_path = dir.join("tokenizer.json");
        for path in [&config_path, &tokenizer_path] {
            if !path.exists() {
                bail!("Missing model file: {}", path.display());
            }
        }
        let weights = safetensors_files(dir)?;

        let config: t5::Config = serde_json::from_str(
            &std::fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?,
        )?;
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Tokenizer error: {}", e))?;

        // SAFETY: the weight files are not modified while mapped
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&weights, DType::F32, &device)? };
        let model = t5::T5ForConditionalGeneration::load(vb, &config)?;

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "seq2seq".to_string());

        tracing::info!("[MODEL] ✅ Loaded {} ({} weight files)", name, weights.len());
        tracing::info!("[MODEL]   - Vocab size: {}", config.vocab_size);
        tracing::info!("[MODEL]   - EOS token: {}", config.eos_token_id);

        Ok(Self {
            model,
            tokenizer,
            config,
            device,
            name,
        })
    }

    fn decoder_start_token(&self) -> u32 {
        self.config
            .decoder_start_token_id
            .unwrap_or(self.config.pad_token_id) as u32
    }
}

impl SummaryModel for Seq2SeqSummarizer {
    fn generate<'a>(&'a mut self, request: &GenerationRequest) -> Result<FragmentStream<'a>> {
        let params = request.params();
        let prompt = request.prompt();

        let encoding = self
            .tokenizer
            .encode(prompt.as_str(), true)
            .map_err(|e| anyhow!("Tokenizer error: {}", e))?;
        let input_ids = encoding.get_ids();
        if input_ids.is_empty() {
            bail!("Empty prompt after tokenization");
        }
        tracing::info!("[GENERATION] Prompt: {} tokens", input_ids.len());

        self.model.clear_kv_cache();
        let input = Tensor::new(input_ids, &self.device)?.unsqueeze(0)?;
        let encoder_output = self.model.encode(&input)?;

        let start_token = self.decoder_start_token();
        Ok(Box::new(Seq2SeqGeneration {
            model: &mut self.model,
            streamer: TextStreamer::new(&self.tokenizer),
            logits_processor: LogitsProcessor::from_sampling(params.seed, sampling_for(params)),
            encoder_output,
            device: &self.device,
            output_ids: vec![start_token],
            eos_token_id: self.config.eos_token_id as u32,
            use_cache: self.config.use_cache,
            min_new_tokens: params.min_new_tokens,
            max_new_tokens: params.max_new_tokens,
            generated: 0,
            phase: Phase::Prime,
        }))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Feed the decoder start token to the streamer
    Prime,
    Decode,
    /// Release text still held by the streamer
    Flush,
    Terminal,
    Done,
}

/// One decoding run. Borrows the model for its whole lifetime.
struct Seq2SeqGeneration<'a> {
    model: &'a mut t5::T5ForConditionalGeneration,
    streamer: TextStreamer<&'a Tokenizer>,
    logits_processor: LogitsProcessor,
    encoder_output: Tensor,
    device: &'a Device,
    output_ids: Vec<u32>,
    eos_token_id: u32,
    use_cache: bool,
    min_new_tokens: usize,
    max_new_tokens: usize,
    generated: usize,
    phase: Phase,
}

impl Seq2SeqGeneration<'_> {
    /// Decode one token. `None` means the model produced EOS.
    fn step(&mut self) -> Result<Option<u32>> {
        let decoder_ids = if self.generated == 0 || !self.use_cache {
            Tensor::new(self.output_ids.as_slice(), self.device)?.unsqueeze(0)?
        } else {
            let last = *self
                .output_ids
                .last()
                .ok_or_else(|| anyhow!("decoder input is empty"))?;
            Tensor::new(&[last], self.device)?.unsqueeze(0)?
        };

        let logits = self
            .model
            .decode(&decoder_ids, &self.encoder_output)?
            .squeeze(0)?
            .to_dtype(DType::F32)?;
        let logits = if self.generated < self.min_new_tokens {
            suppress_token(&logits, self.eos_token_id)?
        } else {
            logits
        };

        let next_token = self.logits_processor.sample(&logits)?;
        if next_token == self.eos_token_id {
            tracing::debug!("[GENERATION] EOS after {} tokens", self.generated);
            return Ok(None);
        }

        self.output_ids.push(next_token);
        self.generated += 1;
        Ok(Some(next_token))
    }

    fn emit(&mut self, token: u32) -> Option<Result<Fragment>> {
        match self.streamer.put(token) {
            Ok(text) => Some(Ok(Fragment::text(text))),
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, err: anyhow::Error) -> Option<Result<Fragment>> {
        tracing::error!("[GENERATION] Decoding failed after {} tokens: {:#}", self.generated, err);
        self.phase = Phase::Done;
        Some(Err(err))
    }
}

impl Iterator for Seq2SeqGeneration<'_> {
    type Item = Result<Fragment>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.phase {
                Phase::Prime => {
                    self.phase = Phase::Decode;
                    let start = self.output_ids[0];
                    return self.emit(start);
                }
                Phase::Decode => {
                    if self.generated >= self.max_new_tokens {
                        tracing::debug!("[GENERATION] Reached max_new_tokens ({})", self.max_new_tokens);
                        self.phase = Phase::Flush;
                        continue;
                    }
                    match self.step() {
                        Ok(Some(token)) => return self.emit(token),
                        Ok(None) => self.phase = Phase::Flush,
                        Err(e) => return self.fail(e),
                    }
                }
                Phase::Flush => {
                    self.phase = Phase::Terminal;
                    match self.streamer.end() {
                        Ok(rest) if rest.is_empty() => continue,
                        Ok(rest) => return Some(Ok(Fragment::text(rest))),
                        Err(e) => return self.fail(e),
                    }
                }
                Phase::Terminal => {
                    self.phase = Phase::Done;
                    return Some(Ok(Fragment::terminal()));
                }
                Phase::Done => return None,
            }
        }
    }
}

/// Map decoding parameters onto Candle's sampling strategies
pub fn sampling_for(params: &DecodingParams) -> Sampling {
    let temperature = params.temperature;
    let top_p = (params.top_p < 1.0).then_some(params.top_p);

    match (temperature <= 0.0, params.top_k, top_p) {
        (true, _, _) => Sampling::ArgMax,
        (false, None, None) => Sampling::All { temperature },
        (false, Some(k), None) => Sampling::TopK { k, temperature },
        (false, None, Some(p)) => Sampling::TopP { p, temperature },
        (false, Some(k), Some(p)) => Sampling::TopKThenTopP { k, p, temperature },
    }
}

/// Make `token` unsampleable
fn suppress_token(logits: &Tensor, token: u32) -> candle_core::Result<Tensor> {
    let mut values = logits.to_vec1::<f32>()?;
    if let Some(v) = values.get_mut(token as usize) {
        *v = f32::NEG_INFINITY;
    }
    Tensor::from_vec(values, logits.shape(), logits.device())
}

fn safetensors_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading model directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "safetensors"))
        .collect();
    if files.is_empty() {
        bail!("No .safetensors weights in {}", dir.display());
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_sample_top_k() {
        let sampling = sampling_for(&DecodingParams::default());
        assert!(matches!(sampling, Sampling::TopK { k: 50, .. }));
    }

    #[test]
    fn zero_temperature_is_greedy() {
        let params = DecodingParams {
            temperature: 0.0,
            ..Default::default()
        };
        assert!(matches!(sampling_for(&params), Sampling::ArgMax));
    }

    #[test]
    fn nucleus_below_one_combines_with_top_k() {
        let params = DecodingParams {
            top_p: 0.9,
            ..Default::default()
        };
        assert!(matches!(sampling_for(&params), Sampling::TopKThenTopP { k: 50, .. }));

        let params = DecodingParams {
            top_p: 0.9,
            top_k: None,
            ..Default::default()
        };
        assert!(matches!(sampling_for(&params), Sampling::TopP { .. }));
    }

    #[test]
    fn suppressed_token_is_never_sampled() -> candle_core::Result<()> {
        let logits = Tensor::new(&[0.1f32, 9.0, 0.2], &Device::Cpu)?;
        let logits = suppress_token(&logits, 1)?;
        let values = logits.to_vec1::<f32>()?;
        assert!(values[1].is_infinite() && values[1] < 0.0);

        let mut processor = LogitsProcessor::from_sampling(7, Sampling::ArgMax);
        assert_eq!(processor.sample(&logits)?, 2);
        Ok(())
    }

    #[test]
    fn load_reports_missing_files() {
        let dir = std::env::temp_dir().join(format!("summarizer-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let err = Seq2SeqSummarizer::load(&dir, Device::Cpu).err().unwrap();
        assert!(err.to_string().contains("config.json"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
