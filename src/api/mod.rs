pub mod handlers;
pub mod middleware;
pub mod routes;

pub const TTS_PATH: &str = "/api/tts";
