use serde::Deserialize;

// -- Form payloads --

/// The login form. Field names double as the HTML input names; the
/// cookie reuses `strindtnavn` as its key.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub kirkegard: String,
    pub strindtnavn: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageForm {
    pub msg: String,
}

/// Body for POST/UPDATE on `/status`. DELETE sends no body, so the
/// text is optional and the whole form defaults to empty.
#[derive(Debug, Default, Deserialize)]
pub struct StatusForm {
    pub txt: Option<String>,
}

/// Body for the permission upsert. `bdfl` is not accepted over HTTP;
/// only the store's raw upsert can set it.
#[derive(Debug, Deserialize)]
pub struct PermissionForm {
    pub user: String,
    #[serde(default)]
    pub kvissmaster: bool,
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub tilganger: bool,
}
