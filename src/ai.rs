//! AI fallback filename parser.
//!
//! Sends the whole batch of filenames to Gemini `generateContent` in one
//! request and turns the returned (artist, title, track number) triples into
//! proposals. This path is independent of the deterministic template cascade.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::AiError;
use crate::fetch::http_agent;
use crate::models::{LocalTrack, MatchStatus, MatchedTrack, NameFormat, TemplateCandidate};
use crate::normalize::extract_bpm;
use crate::template::propose_name;

pub const GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-lite:generateContent";

/// Confidence reported for every AI-derived proposal
pub const AI_CONFIDENCE: f64 = 0.75;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseCandidate {
    #[serde(default)]
    content: ResponseContent,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// One filename as understood by the model.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AiParsedTrack {
    #[serde(default)]
    pub original_filename: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub track_number: String,
}

#[derive(Debug, Default, Deserialize)]
struct AiTrackList {
    #[serde(default)]
    tracks: Vec<AiParsedTrack>,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

// ============================================================================
// Prompt and Response Handling
// ============================================================================

pub fn build_prompt(filenames: &[String]) -> String {
    format!(
        "\nI have a list of audio filenames that are messy. Please extract the Artist, Title, and Track Number (if present) for each.\n\
         Return the result as a JSON object with a key \"tracks\" containing a list of objects.\n\
         Each object should have: \"original_filename\", \"artist\", \"title\", \"track_number\".\n\
         If a field is missing, use an empty string.\n\
         Do not include any markdown formatting (like ```json) in the response, just the raw JSON string.\n\
         \n\
         Filenames:\n\
         {}\n",
        filenames.join("\n")
    )
}

/// Remove a surrounding ```json / ``` fence.
pub fn strip_code_fence(content: &str) -> &str {
    let content = content
        .strip_prefix("```json")
        .or_else(|| content.strip_prefix("```"))
        .unwrap_or(content);
    content.strip_suffix("```").unwrap_or(content).trim()
}

/// Parse the model's text reply into per-file results.
pub fn parse_ai_content(content: &str) -> Result<Vec<AiParsedTrack>, AiError> {
    let cleaned = strip_code_fence(content);
    serde_json::from_str::<AiTrackList>(cleaned)
        .map(|list| list.tracks)
        .map_err(|error| AiError::Parse {
            error,
            content: cleaned.to_string(),
        })
}

fn first_text(response: GenerateResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content
        .parts
        .into_iter()
        .next()
        .map(|part| part.text)
}

// ============================================================================
// Client
// ============================================================================

/// Ask the model to parse a batch of filenames.
pub fn parse_filenames_with_ai(filenames: &[String], api_key: &str) -> Result<Vec<AiParsedTrack>, AiError> {
    if api_key.trim().is_empty() {
        return Err(AiError::MissingKey);
    }

    let prompt = build_prompt(filenames);
    let request = GenerateRequest {
        contents: vec![RequestContent {
            parts: vec![RequestPart { text: &prompt }],
        }],
    };

    info!("Asking AI to parse {} filenames", filenames.len());
    let response = match http_agent()
        .post(GEMINI_ENDPOINT)
        .query("key", api_key)
        .send_json(&request)
    {
        Ok(response) => response,
        Err(ureq::Error::Status(code, response)) => {
            let status = format!("{} {}", code, response.status_text());
            let body = response.into_string().unwrap_or_default();
            return Err(AiError::Status { status, body });
        }
        Err(ureq::Error::Transport(transport)) => return Err(AiError::Transport(transport.to_string())),
    };

    let decoded: GenerateResponse = response.into_json()?;
    let content = first_text(decoded).ok_or(AiError::EmptyResponse)?;
    debug!("AI response: {}", content);
    parse_ai_content(&content)
}

// ============================================================================
// Proposals
// ============================================================================

/// Pair model results with local files: by reported filename first, then by
/// position for entries whose filename the model mangled.
fn result_for<'a>(results: &'a [AiParsedTrack], local: &LocalTrack, index: usize) -> Option<&'a AiParsedTrack> {
    results
        .iter()
        .find(|r| r.original_filename.trim() == local.original_name)
        .or_else(|| {
            results
                .get(index)
                .filter(|r| r.original_filename.trim().is_empty())
        })
}

/// Proposal for one file from its AI result. BPM annotations in the original
/// name are carried over.
pub fn ai_proposal(local: &LocalTrack, parsed: Option<&AiParsedTrack>, format: NameFormat) -> MatchedTrack {
    let Some(parsed) = parsed else {
        return MatchedTrack::unmatched(local);
    };
    let bpm = extract_bpm(local.stem());
    let candidate = TemplateCandidate {
        artist: parsed.artist.trim().to_string(),
        title: parsed.title.trim().to_string(),
        track: parsed.track_number.trim().to_string(),
        bpm: bpm.bpm,
        bpm_style: bpm.style,
        confidence: AI_CONFIDENCE,
    };
    if !candidate.is_usable() {
        return MatchedTrack::unmatched(local);
    }
    MatchedTrack {
        local_path: local.path.clone(),
        original_name: local.original_name.clone(),
        proposed_new_name: propose_name(&candidate, format, &local.original_name),
        confidence: candidate.confidence,
        status: MatchStatus::Ai,
    }
}

/// AI-mode proposals: one entry per local file.
pub fn ai_renames(tracks: &[LocalTrack], api_key: &str, format: NameFormat) -> Result<Vec<MatchedTrack>, AiError> {
    let filenames: Vec<String> = tracks.iter().map(|t| t.original_name.clone()).collect();
    let results = parse_filenames_with_ai(&filenames, api_key)?;
    if results.len() != tracks.len() {
        warn!("AI returned {} results for {} files", results.len(), tracks.len());
    }
    Ok(tracks
        .iter()
        .enumerate()
        .map(|(i, local)| ai_proposal(local, result_for(&results, local, i), format))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn local(name: &str) -> LocalTrack {
        LocalTrack::new(PathBuf::from(format!("/music/{}", name)), name)
    }

    #[test]
    fn test_missing_key() {
        let err = parse_filenames_with_ai(&["a.mp3".to_string()], " ").unwrap_err();
        assert_eq!(err.to_string(), "API key is required");
    }

    #[test]
    fn test_prompt_lists_filenames() {
        let prompt = build_prompt(&["a.mp3".to_string(), "b.flac".to_string()]);
        assert!(prompt.contains("\"original_filename\", \"artist\", \"title\", \"track_number\""));
        assert!(prompt.ends_with("Filenames:\na.mp3\nb.flac\n"));
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"tracks\": []}\n```"), "{\"tracks\": []}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {} "), "{}");
    }

    #[test]
    fn test_parse_ai_content() {
        let tracks = parse_ai_content(
            "```json\n{\"tracks\": [{\"original_filename\": \"x.mp3\", \"artist\": \"A\", \"title\": \"T\", \"track_number\": 3}]}\n```",
        )
        .unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_number, "3");

        let err = parse_ai_content("not json").unwrap_err();
        assert!(err.to_string().starts_with("failed to parse AI response:"));
        assert!(err.to_string().ends_with("Content: not json"));
    }

    #[test]
    fn test_first_text() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "hello"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(first_text(response).as_deref(), Some("hello"));
        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert_eq!(first_text(empty), None);
    }

    #[test]
    fn test_ai_proposal() {
        let file = local("dj_foo-night_drive-128bpm.mp3");
        let parsed = AiParsedTrack {
            original_filename: file.original_name.clone(),
            artist: "DJ Foo".to_string(),
            title: "Night Drive".to_string(),
            track_number: "3".to_string(),
        };
        let proposal = ai_proposal(&file, Some(&parsed), NameFormat::TrackArtistTitle);
        assert_eq!(proposal.proposed_new_name, "03. DJ Foo - Night Drive (128Bpm).mp3");
        assert_eq!(proposal.status.to_string(), "AI Match");
        assert_eq!(proposal.confidence, AI_CONFIDENCE);

        let half = AiParsedTrack {
            title: "Night Drive".to_string(),
            ..Default::default()
        };
        assert_eq!(
            ai_proposal(&file, Some(&half), NameFormat::TrackTitle).status,
            MatchStatus::NoMatch
        );
        assert_eq!(ai_proposal(&file, None, NameFormat::TrackTitle).proposed_new_name, file.original_name);
    }

    #[test]
    fn test_result_pairing() {
        let files = [local("a.mp3"), local("b.mp3")];
        let results = vec![
            AiParsedTrack {
                original_filename: "b.mp3".to_string(),
                title: "B".to_string(),
                ..Default::default()
            },
            AiParsedTrack {
                title: "unnamed".to_string(),
                ..Default::default()
            },
        ];
        assert_eq!(result_for(&results, &files[1], 1).map(|r| r.title.as_str()), Some("B"));
        assert_eq!(result_for(&results, &files[0], 0), None);
        assert_eq!(result_for(&results, &local("c.mp3"), 1).map(|r| r.title.as_str()), Some("unnamed"));
    }
}
