use serde::Serialize;

/// Query for the folder listing used as the status endpoint.
#[derive(Debug, Serialize)]
pub struct SyncFoldersQuery<'a> {
    pub token: &'a str,
    pub action: &'static str,
    pub discovery: u8,
    /// Cache buster, unix seconds.
    pub t: i64,
}

impl<'a> SyncFoldersQuery<'a> {
    pub fn new(token: &'a str, now: i64) -> Self {
        Self {
            token,
            action: "getsyncfolders",
            discovery: 1,
            t: now,
        }
    }
}

pub const TOKEN_PATH: &str = "token.html";
