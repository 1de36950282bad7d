use anyhow::Result;

use crate::transcribe::processor::SubtitleEntry;
use crate::transcribe::OutputRecord;
use crate::utils::format_duration;

/// Format milliseconds as an SRT timestamp (HH:MM:SS,mmm)
pub fn format_srt_time(milliseconds: u64) -> String {
    let total_seconds = milliseconds / 1000;
    let ms = milliseconds % 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, ms)
}

/// Render subtitle entries as an SRT document, one block per entry in input order
pub fn format_as_srt(entries: &[SubtitleEntry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let speaker = entry
                .speaker_id
                .map(|id| format!("[说话人{}] ", id))
                .unwrap_or_default();

            format!(
                "{}\n{} --> {}\n{}{}\n",
                index + 1,
                format_srt_time(entry.start_time),
                format_srt_time(entry.end_time),
                speaker,
                entry.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Human-readable summary of one output record
pub fn format_as_text(record: &OutputRecord) -> String {
    let mut out = String::new();

    out.push_str(&format!("Title: {}\n", record.metadata.title));
    out.push_str(&format!("Video ID: {}\n", record.metadata.video_id));
    if let Some(transcript) = &record.transcript {
        if !transcript.author.is_empty() {
            out.push_str(&format!("Author: {}\n", transcript.author));
        }
        if transcript.duration > 0 {
            out.push_str(&format!("Duration: {}\n", format_duration(transcript.duration)));
        }
    }
    out.push_str(&format!("Download URL: {}\n", record.metadata.download_url));

    if let Some(transcript) = &record.transcript {
        out.push('\n');
        out.push_str(&transcript.full_text);
        out.push('\n');
    }

    out
}

/// Pretty JSON; a single record is emitted as an object, several as an array
pub fn format_as_json(records: &[OutputRecord]) -> Result<String> {
    let json = match records {
        [record] => serde_json::to_string_pretty(record)?,
        records => serde_json::to_string_pretty(records)?,
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(start: u64, end: u64, text: &str, speaker: Option<i64>) -> SubtitleEntry {
        SubtitleEntry {
            start_time: start,
            end_time: end,
            text: text.to_string(),
            speaker_id: speaker,
        }
    }

    #[test]
    fn test_format_srt_time() {
        assert_eq!(format_srt_time(0), "00:00:00,000");
        assert_eq!(format_srt_time(2500), "00:00:02,500");
        assert_eq!(format_srt_time(3_723_004), "01:02:03,004");
        assert_eq!(format_srt_time(360_000_000), "100:00:00,000");
    }

    #[test]
    fn test_format_as_srt() {
        let srt = format_as_srt(&[entry(0, 1000, "a", None), entry(1000, 2500, "b", None)]);
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:01,000\na\n\n2\n00:00:01,000 --> 00:00:02,500\nb\n"
        );
    }

    #[test]
    fn test_format_as_srt_speaker_prefix() {
        let srt = format_as_srt(&[entry(61_000, 62_345, "你好", Some(1))]);
        assert_eq!(srt, "1\n00:01:01,000 --> 00:01:02,345\n[说话人1] 你好\n");
    }

    #[test]
    fn test_format_as_srt_empty() {
        assert_eq!(format_as_srt(&[]), "");
    }
}
