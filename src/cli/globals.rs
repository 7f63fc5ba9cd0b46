use crate::session::Portal;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct GlobalArgs {
    pub api_url: String,
    pub portal: Portal,
    pub session_file: PathBuf,
}

impl GlobalArgs {
    #[must_use]
    pub const fn new(api_url: String, portal: Portal, session_file: PathBuf) -> Self {
        Self {
            api_url,
            portal,
            session_file,
        }
    }
}
