use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::output::formatters::format_as_srt;

/// One timed subtitle line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleEntry {
    /// Start time in milliseconds
    pub start_time: u64,

    /// End time in milliseconds, always after `start_time`
    pub end_time: u64,

    /// Trimmed, non-empty text
    pub text: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_id: Option<i64>,
}

/// Normalized recognition output.
///
/// On failure `success` is false, `error` explains why and every content field is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResult {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Channel texts joined by newline
    pub full_text: String,

    /// Entries in channel order, then sentence order
    pub subtitle_entries: Vec<SubtitleEntry>,

    pub srt_subtitle: String,

    /// Original media duration in milliseconds
    pub duration: u64,

    pub channels: Vec<Value>,

    pub audio_format: String,

    pub sampling_rate: u64,

    /// Parsed payload as received, kept for auditing
    pub original_data: Option<Value>,
}

impl TranscriptResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            full_text: String::new(),
            subtitle_entries: Vec::new(),
            srt_subtitle: String::new(),
            duration: 0,
            channels: Vec::new(),
            audio_format: String::new(),
            sampling_rate: 0,
            original_data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// Transcript file envelope
#[derive(Debug, Deserialize)]
struct TranscriptPayload {
    transcripts: Option<Value>,
    properties: Option<Value>,
}

/// Passthrough properties; each field falls back on its own when mistyped
#[derive(Debug, Default)]
struct TranscriptProperties {
    audio_format: String,
    channels: Vec<Value>,
    original_sampling_rate: u64,
    original_duration_in_milliseconds: u64,
}

impl TranscriptProperties {
    fn from_value(properties: &Value) -> Self {
        if !properties.is_object() {
            tracing::warn!("Ignoring transcript properties: not an object");
            return Self::default();
        }

        Self {
            audio_format: properties
                .get("audio_format")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            channels: properties
                .get("channels")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            original_sampling_rate: properties
                .get("original_sampling_rate")
                .and_then(whole_number)
                .unwrap_or_default(),
            original_duration_in_milliseconds: properties
                .get("original_duration_in_milliseconds")
                .and_then(whole_number)
                .unwrap_or_default(),
        }
    }
}

// Fields stay untyped so one mistyped field never costs the whole record
#[derive(Debug, Deserialize)]
struct ChannelRecord {
    text: Option<Value>,
    sentences: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SentenceRecord {
    text: Option<Value>,
    begin_time: Option<Value>,
    end_time: Option<Value>,
    speaker_id: Option<Value>,
}

/// Numbers arrive as JSON numbers, occasionally as numeric strings
fn numeric(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Non-negative number floored to an integer
fn whole_number(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| numeric(value).filter(|n| *n >= 0.0).map(|n| n.floor() as u64))
}

/// Integral speaker id; fractional or non-numeric ids are dropped
fn speaker_id(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| numeric(value).filter(|n| n.fract() == 0.0).map(|n| n as i64))
}

/// Normalize a transcript document given as raw JSON text
pub fn normalize(raw: &str) -> TranscriptResult {
    if raw.trim().is_empty() {
        return TranscriptResult::failure("transcript payload is empty");
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(value) => normalize_value(&value),
        Err(e) => TranscriptResult::failure(format!("transcript payload is not valid JSON: {}", e)),
    }
}

/// Normalize an already parsed transcript document
pub fn normalize_value(data: &Value) -> TranscriptResult {
    if !data.is_object() {
        return TranscriptResult::failure("transcript payload is not a JSON object");
    }

    let payload: TranscriptPayload = match serde_json::from_value(data.clone()) {
        Ok(payload) => payload,
        Err(e) => return TranscriptResult::failure(format!("unexpected transcript payload: {}", e)),
    };

    let channels = match payload.transcripts {
        Some(Value::Array(channels)) if !channels.is_empty() => channels,
        Some(Value::Array(_)) => return TranscriptResult::failure("transcripts array is empty"),
        Some(_) => return TranscriptResult::failure("transcripts field is not an array"),
        None => return TranscriptResult::failure("transcript payload has no transcripts field"),
    };

    let mut texts = Vec::new();
    let mut entries = Vec::new();

    for (channel_index, channel) in channels.into_iter().enumerate() {
        if !channel.is_object() {
            tracing::warn!("Skipping transcript channel {}: not an object", channel_index);
            continue;
        }

        let channel: ChannelRecord = match serde_json::from_value(channel) {
            Ok(channel) => channel,
            Err(e) => {
                tracing::warn!("Skipping transcript channel {}: {}", channel_index, e);
                continue;
            }
        };

        match channel.text {
            Some(Value::String(text)) if !text.is_empty() => texts.push(text),
            Some(Value::String(_)) | Some(Value::Null) | None => {}
            Some(_) => tracing::warn!("Ignoring transcript channel {} text: not a string", channel_index),
        }

        match channel.sentences {
            Some(Value::Array(sentences)) => {
                for (sentence_index, sentence) in sentences.into_iter().enumerate() {
                    match sentence_entry(sentence) {
                        Ok(Some(entry)) => entries.push(entry),
                        Ok(None) => {}
                        Err(e) => tracing::warn!(
                            "Skipping sentence {}-{}: {}",
                            channel_index,
                            sentence_index,
                            e
                        ),
                    }
                }
            }
            Some(_) => tracing::warn!("Transcript channel {} sentences is not an array", channel_index),
            None => {}
        }
    }

    if texts.is_empty() && entries.is_empty() {
        return TranscriptResult::failure("no usable content extracted from transcripts");
    }

    let properties = payload
        .properties
        .as_ref()
        .map(TranscriptProperties::from_value)
        .unwrap_or_default();

    TranscriptResult {
        success: true,
        error: None,
        full_text: texts.join("\n"),
        srt_subtitle: format_as_srt(&entries),
        subtitle_entries: entries,
        duration: properties.original_duration_in_milliseconds,
        channels: properties.channels,
        audio_format: properties.audio_format,
        sampling_rate: properties.original_sampling_rate,
        original_data: Some(data.clone()),
    }
}

/// A usable entry, `Ok(None)` for a sentence that is silently dropped
fn sentence_entry(sentence: Value) -> Result<Option<SubtitleEntry>, serde_json::Error> {
    if !sentence.is_object() {
        return Ok(None);
    }

    let sentence: SentenceRecord = serde_json::from_value(sentence)?;

    let text = match sentence.text.as_ref().and_then(Value::as_str).map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => return Ok(None),
    };

    let begin = sentence.begin_time.as_ref().and_then(numeric);
    let end = sentence.end_time.as_ref().and_then(numeric);
    let (begin, end) = match (begin, end) {
        (Some(begin), Some(end)) if begin >= 0.0 && end >= 0.0 => (begin.floor() as u64, end.floor() as u64),
        _ => return Ok(None),
    };

    if begin >= end {
        return Ok(None);
    }

    Ok(Some(SubtitleEntry {
        start_time: begin,
        end_time: end,
        text,
        speaker_id: sentence.speaker_id.as_ref().and_then(speaker_id),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "file_url": "https://cdn/play/1",
            "properties": {
                "audio_format": "aac",
                "channels": [0],
                "original_sampling_rate": 44100,
                "original_duration_in_milliseconds": 8250
            },
            "transcripts": [{
                "channel_id": 0,
                "text": "大家好。今天聊聊Rust。",
                "sentences": [
                    { "begin_time": 0, "end_time": 1200, "text": " 大家好。 ", "speaker_id": 0 },
                    { "begin_time": 1200, "end_time": 3400, "text": "今天聊聊Rust。" }
                ]
            }]
        })
    }

    #[test]
    fn test_normalizes_single_channel() {
        let result = normalize_value(&payload());

        assert!(result.is_success());
        assert_eq!(result.error, None);
        assert_eq!(result.full_text, "大家好。今天聊聊Rust。");
        assert_eq!(result.subtitle_entries.len(), 2);
        assert_eq!(result.subtitle_entries[0].text, "大家好。");
        assert_eq!(result.subtitle_entries[0].speaker_id, Some(0));
        assert_eq!(result.subtitle_entries[1].speaker_id, None);
        assert_eq!(result.duration, 8250);
        assert_eq!(result.sampling_rate, 44100);
        assert_eq!(result.audio_format, "aac");
        assert_eq!(result.channels, vec![json!(0)]);
        assert!(result.srt_subtitle.starts_with("1\n00:00:00,000 --> 00:00:01,200\n[说话人0] 大家好。\n"));
        assert_eq!(result.original_data, Some(payload()));
    }

    #[test]
    fn test_empty_transcripts_is_failure() {
        let result = normalize_value(&json!({ "transcripts": [] }));

        assert!(!result.success);
        assert!(!result.error.as_deref().unwrap_or_default().is_empty());
        assert!(result.full_text.is_empty());
        assert!(result.subtitle_entries.is_empty());
        assert!(result.srt_subtitle.is_empty());
        assert_eq!(result.duration, 0);
        assert_eq!(result.sampling_rate, 0);
        assert!(result.channels.is_empty());
        assert!(result.audio_format.is_empty());
        assert_eq!(result.original_data, None);
    }

    #[test]
    fn test_missing_or_malformed_transcripts_is_failure() {
        assert!(!normalize_value(&json!({ "properties": {} })).success);
        assert!(!normalize_value(&json!({ "transcripts": "text" })).success);
        assert!(!normalize_value(&json!([1, 2])).success);
        assert!(!normalize("").success);
        assert!(!normalize("{oops").success);
    }

    #[test]
    fn test_invalid_sentences_are_dropped() {
        let data = json!({
            "transcripts": [{
                "sentences": [
                    { "begin_time": 5, "end_time": 3, "text": "inverted" },
                    { "begin_time": -1, "end_time": 3, "text": "negative" },
                    { "begin_time": 0, "end_time": 3 },
                    { "begin_time": 0, "end_time": 3, "text": "   " },
                    { "end_time": 3, "text": "no begin" },
                    { "begin_time": "abc", "end_time": 3, "text": "not numeric" },
                    { "begin_time": 3, "end_time": 3, "text": "zero length" },
                    { "begin_time": 0, "end_time": 3, "text": 42 },
                    "not an object",
                    { "begin_time": "100", "end_time": 900.7, "text": "kept" }
                ]
            }]
        });

        let result = normalize_value(&data);
        assert!(result.success);
        assert_eq!(
            result.subtitle_entries,
            vec![SubtitleEntry {
                start_time: 100,
                end_time: 900,
                text: "kept".to_string(),
                speaker_id: None,
            }]
        );
        assert!(result.full_text.is_empty());
    }

    #[test]
    fn test_channels_keep_input_order() {
        let data = json!({
            "transcripts": [
                { "text": "second speaker", "sentences": [{ "begin_time": 5000, "end_time": 6000, "text": "late" }] },
                "garbage",
                { "text": "first speaker", "sentences": "not a list" },
                { "text": "third", "sentences": [{ "begin_time": 0, "end_time": 1000, "text": "early" }] }
            ]
        });

        let result = normalize_value(&data);
        assert_eq!(result.full_text, "second speaker\nfirst speaker\nthird");
        let texts: Vec<_> = result.subtitle_entries.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["late", "early"]);
        assert_eq!(result.duration, 0);
    }

    #[test]
    fn test_mistyped_channel_text_keeps_sentences() {
        let data = json!({
            "transcripts": [{
                "text": 5,
                "sentences": [{ "begin_time": 0, "end_time": 1000, "text": "hi" }]
            }]
        });

        let result = normalize_value(&data);
        assert!(result.success);
        assert!(result.full_text.is_empty());
        assert_eq!(result.subtitle_entries.len(), 1);
        assert_eq!(result.subtitle_entries[0].text, "hi");
    }

    #[test]
    fn test_loose_speaker_ids_keep_sentences() {
        let data = json!({
            "transcripts": [{
                "sentences": [
                    { "begin_time": 0, "end_time": 1000, "text": "one", "speaker_id": "1" },
                    { "begin_time": 1000, "end_time": 2000, "text": "two", "speaker_id": 2.0 },
                    { "begin_time": 2000, "end_time": 3000, "text": "three", "speaker_id": 0.5 },
                    { "begin_time": 3000, "end_time": 4000, "text": "four", "speaker_id": { "id": 4 } }
                ]
            }]
        });

        let result = normalize_value(&data);
        let speakers: Vec<_> = result.subtitle_entries.iter().map(|e| e.speaker_id).collect();
        assert_eq!(speakers, vec![Some(1), Some(2), None, None]);
        assert!(result.srt_subtitle.contains("[说话人1] one"));
    }

    #[test]
    fn test_mistyped_property_only_defaults_itself() {
        let data = json!({
            "properties": {
                "audio_format": "aac",
                "channels": "mono",
                "original_sampling_rate": 16000.0,
                "original_duration_in_milliseconds": "8250"
            },
            "transcripts": [{ "text": "hello" }]
        });

        let result = normalize_value(&data);
        assert!(result.success);
        assert_eq!(result.audio_format, "aac");
        assert_eq!(result.sampling_rate, 16000);
        assert_eq!(result.duration, 8250);
        assert!(result.channels.is_empty());

        let result = normalize_value(&json!({
            "properties": { "audio_format": 7, "original_sampling_rate": 44100 },
            "transcripts": [{ "text": "hello" }]
        }));
        assert_eq!(result.audio_format, "");
        assert_eq!(result.sampling_rate, 44100);
    }

    #[test]
    fn test_nothing_usable_is_failure() {
        let data = json!({
            "transcripts": [{ "text": "", "sentences": [{ "begin_time": 1, "end_time": 0, "text": "x" }] }]
        });

        let result = normalize_value(&data);
        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let raw = payload().to_string();
        assert_eq!(normalize(&raw), normalize(&raw));
    }
}
