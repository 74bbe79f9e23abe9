//! The User-Agent header sent with every request.

pub const USER_AGENT: &str = concat!(
    "pitchlog/",
    env!("CARGO_PKG_VERSION"),
    " (baseball research; polite scraper)"
);

const BROWSER_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

/// User agent chosen by the `user_agent` setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAgent {
    /// Identifies the tool.
    Tool,
    /// A common desktop browser string (`"impersonate"`).
    Browser,
    Custom(String),
}

impl UserAgent {
    pub fn from_setting(setting: Option<&str>) -> Self {
        match setting.map(str::trim) {
            None | Some("") => Self::Tool,
            Some("impersonate") => Self::Browser,
            Some(custom) => Self::Custom(custom.to_string()),
        }
    }

    pub fn header_value(&self) -> String {
        match self {
            Self::Tool => USER_AGENT.to_string(),
            Self::Browser => {
                let index = std::process::id() as usize % BROWSER_USER_AGENTS.len();
                BROWSER_USER_AGENTS[index].to_string()
            }
            Self::Custom(value) => value.clone(),
        }
    }
}
