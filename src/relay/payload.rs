use serde::Serialize;
use serde_json::{json, Value};

pub const UPSTREAM_MODEL: &str = "speech-2.5-hd-preview";
pub const FIXED_BITRATE: u32 = 128_000;

/// Caller's JSON body for `POST /api/tts`.
///
/// Values are forwarded as sent; the provider validates them. Only absent
/// or `null` fields fall back to defaults.
#[derive(Debug, Default)]
pub struct SpeechRequest {
    /// The provider rejects a missing text.
    pub text: Option<Value>,
    pub voice: Option<Value>,
    pub speed: Option<Value>,
    pub pitch: Option<Value>,
    pub vol: Option<Value>,
    pub sample_rate: Option<Value>,
    pub format: Option<Value>,
    pub language: Option<Value>,
}

const DEFAULT_VOICE: &str = "Boyan_new_platform";
const DEFAULT_FORMAT: &str = "mp3";
const DEFAULT_LANGUAGE: &str = "auto";

impl SpeechRequest {
    /// Fails only when the body is not JSON at all. A non-object body
    /// carries no fields.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body).map(Self::from_value)
    }

    pub fn from_value(value: Value) -> Self {
        let field = |name: &str| value.get(name).filter(|v| !v.is_null()).cloned();

        Self {
            text: field("text"),
            voice: field("voice"),
            speed: field("speed"),
            pitch: field("pitch"),
            vol: field("vol"),
            sample_rate: field("sample_rate"),
            format: field("format"),
            language: field("language"),
        }
    }

    /// Falsy voices (empty string, `false`, `0`) fall back to the default too.
    pub fn voice(&self) -> Value {
        match &self.voice {
            Some(v) if !is_falsy(v) => v.clone(),
            _ => json!(DEFAULT_VOICE),
        }
    }

    pub fn speed(&self) -> Value {
        self.speed.clone().unwrap_or_else(|| json!(1))
    }

    pub fn pitch(&self) -> Value {
        self.pitch.clone().unwrap_or_else(|| json!(0))
    }

    pub fn vol(&self) -> Value {
        self.vol.clone().unwrap_or_else(|| json!(1))
    }

    pub fn sample_rate(&self) -> Value {
        self.sample_rate.clone().unwrap_or_else(|| json!(32_000))
    }

    pub fn format(&self) -> Value {
        self.format.clone().unwrap_or_else(|| json!(DEFAULT_FORMAT))
    }

    pub fn language(&self) -> Value {
        self.language.clone().unwrap_or_else(|| json!(DEFAULT_LANGUAGE))
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

#[derive(Debug, Serialize)]
pub struct TimberWeight {
    pub voice_id: Value,
    pub weight: u32,
}

#[derive(Debug, Serialize)]
pub struct VoiceSetting {
    pub voice_id: Value,
    pub speed: Value,
    pub pitch: Value,
    pub vol: Value,
    pub latex_read: bool,
}

#[derive(Debug, Serialize)]
pub struct AudioSetting {
    pub sample_rate: Value,
    pub bitrate: u32,
    pub format: Value,
}

/// Body sent to the provider.
#[derive(Debug, Serialize)]
pub struct UpstreamPayload<'a> {
    pub model: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a Value>,
    pub timber_weights: Vec<TimberWeight>,
    pub voice_setting: VoiceSetting,
    pub audio_setting: AudioSetting,
    pub language_boost: Value,
}

impl<'a> UpstreamPayload<'a> {
    pub fn from_request(request: &'a SpeechRequest) -> Self {
        let voice = request.voice();

        Self {
            model: UPSTREAM_MODEL,
            text: request.text.as_ref(),
            timber_weights: vec![TimberWeight {
                voice_id: voice.clone(),
                weight: 100,
            }],
            voice_setting: VoiceSetting {
                voice_id: voice,
                speed: request.speed(),
                pitch: request.pitch(),
                vol: request.vol(),
                latex_read: false,
            },
            audio_setting: AudioSetting {
                sample_rate: request.sample_rate(),
                bitrate: FIXED_BITRATE,
                format: request.format(),
            },
            language_boost: request.language(),
        }
    }
}
