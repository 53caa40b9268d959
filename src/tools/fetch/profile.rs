/// Fetch Profiles
///
/// Each profile is a platform paired with its natural default browser so the
/// User-Agent and client hints always agree:
/// - `Windows` → Chrome
/// - `MacOS` → Safari
/// - `IOS` → Safari
/// - `Android` → Chrome
/// - `Minimal` → Basic Mozilla (no platform-specific headers)
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchProfile {
    /// Minimal (just User-Agent)
    Minimal,

    /// Chrome on Windows
    #[default]
    Windows,

    /// Safari on macOS
    #[serde(rename = "macos")]
    MacOS,

    /// Safari on iPhone
    #[serde(rename = "ios")]
    IOS,

    /// Chrome on Android
    Android,
}

impl FetchProfile {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Minimal => "Minimal",
            Self::Windows => "Windows (Chrome)",
            Self::MacOS => "macOS (Safari)",
            Self::IOS => "iOS (Safari)",
            Self::Android => "Android (Chrome)",
        }
    }
}
