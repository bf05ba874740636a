//! Mapping between audio MIME types and file extensions

/// Extension and MIME type an archived recording is stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    pub extension: &'static str,
    pub mime_type: String,
}

const DEFAULT_EXTENSION: &str = "mp3";

/// Extension for a known audio MIME type
///
/// Matching ignores case and any parameters after `;`.
pub fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "audio/mpeg" => Some("mp3"),
        "audio/webm" => Some("webm"),
        "audio/ogg" => Some("ogg"),
        "audio/x-wav" | "audio/wav" | "audio/vnd.wave" => Some("wav"),
        "audio/mp4" | "audio/m4a" => Some("m4a"),
        _ => None,
    }
}

/// Extension guessed from an agent output format such as `pcm_16000` or `mp3_44100_128`
pub fn extension_for_format_hint(hint: &str) -> Option<&'static str> {
    let hint = hint.to_ascii_lowercase();

    if hint.contains("wav") || hint.contains("pcm") {
        Some("wav")
    } else if hint.contains("webm") {
        Some("webm")
    } else if hint.contains("ogg") {
        Some("ogg")
    } else if hint.contains("mp4") || hint.contains("m4a") {
        Some("m4a")
    } else if hint.contains("mp3") {
        Some("mp3")
    } else {
        None
    }
}

/// Canonical MIME type for an extension
pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension {
        "webm" => "audio/webm",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        _ => "audio/mpeg",
    }
}

/// Decide how a downloaded recording is stored
///
/// The response MIME type wins; otherwise the agent format hint; otherwise mp3.
/// A MIME type the provider did send is kept even when unrecognized.
pub fn resolve_format(mime_type: Option<&str>, format_hint: Option<&str>) -> AudioFormat {
    let extension = mime_type
        .and_then(extension_for_mime)
        .or_else(|| format_hint.and_then(extension_for_format_hint))
        .unwrap_or(DEFAULT_EXTENSION);

    let mime_type = match mime_type {
        Some(mime) if !mime.trim().is_empty() => mime.to_string(),
        _ => mime_for_extension(extension).to_string(),
    };

    AudioFormat {
        extension,
        mime_type,
    }
}
