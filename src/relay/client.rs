use reqwest::Client;

const USER_AGENT: &str = "TTS-Proxy-Service/1.0";

/// Client shared by the primary call and any follow-up audio download.
///
/// No request timeout is set: cancellation follows the inbound request.
pub fn build_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .tcp_nodelay(true)
        .build()
}
