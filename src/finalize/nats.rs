use super::{InstructionExtractor, SpeechSynthesizer, SpeechTranscriber};
use anyhow::Context;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// NATS request/reply wiring for the finalization collaborators. The
/// engines themselves (speech-to-text, text understanding, text-to-speech)
/// run as external services on well-known subjects; these adapters only
/// frame the payloads.
const TRANSCRIBE_SUBJECT: &str = "stt.finalize";
const EXTRACT_SUBJECT: &str = "nlu.instructions.extract";
const SYNTHESIZE_SUBJECT: &str = "tts.synthesize";

#[derive(Debug, Serialize, Deserialize)]
struct TranscribeRequest {
    /// Base64-encoded WAV payload.
    audio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TranscribeResponse {
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ExtractRequest {
    transcript: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ExtractResponse {
    instructions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SynthesizeRequest {
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SynthesizeResponse {
    /// Base64-encoded audio payload.
    audio: String,
}

pub struct NatsSpeechTranscriber {
    client: async_nats::Client,
}

impl NatsSpeechTranscriber {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl SpeechTranscriber for NatsSpeechTranscriber {
    async fn transcribe(&self, audio_wav: &[u8], hint: Option<&str>) -> anyhow::Result<String> {
        let request = TranscribeRequest {
            audio: base64::engine::general_purpose::STANDARD.encode(audio_wav),
            hint: hint.map(str::to_string),
        };
        let payload = serde_json::to_vec(&request)?;

        let reply = self
            .client
            .request(TRANSCRIBE_SUBJECT, payload.into())
            .await
            .context("transcription request failed")?;

        let response: TranscribeResponse =
            serde_json::from_slice(&reply.payload).context("unparseable transcription reply")?;
        Ok(response.text)
    }
}

pub struct NatsInstructionExtractor {
    client: async_nats::Client,
}

impl NatsInstructionExtractor {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl InstructionExtractor for NatsInstructionExtractor {
    async fn extract(&self, transcript: &str) -> anyhow::Result<Vec<String>> {
        let request = ExtractRequest {
            transcript: transcript.to_string(),
        };
        let payload = serde_json::to_vec(&request)?;

        let reply = self
            .client
            .request(EXTRACT_SUBJECT, payload.into())
            .await
            .context("instruction extraction request failed")?;

        let response: ExtractResponse =
            serde_json::from_slice(&reply.payload).context("unparseable extraction reply")?;

        // The extractor returns sentences in spoken order; trim and drop
        // empties so downstream synthesis never sees a blank instruction.
        Ok(response
            .instructions
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }
}

pub struct NatsSpeechSynthesizer {
    client: async_nats::Client,
}

impl NatsSpeechSynthesizer {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for NatsSpeechSynthesizer {
    async fn synthesize(&self, text: &str) -> anyhow::Result<Vec<u8>> {
        let request = SynthesizeRequest {
            text: text.to_string(),
        };
        let payload = serde_json::to_vec(&request)?;

        let reply = self
            .client
            .request(SYNTHESIZE_SUBJECT, payload.into())
            .await
            .context("speech synthesis request failed")?;

        let response: SynthesizeResponse =
            serde_json::from_slice(&reply.payload).context("unparseable synthesis reply")?;
        let audio = base64::engine::general_purpose::STANDARD
            .decode(response.audio)
            .context("synthesis reply carried invalid base64 audio")?;
        Ok(audio)
    }
}
