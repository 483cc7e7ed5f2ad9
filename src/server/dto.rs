use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SigninParams {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub struct SigninUrlParams {
    pub redirect_uri: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub struct GetMessagesParams {
    pub chat: String,
}
