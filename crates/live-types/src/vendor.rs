use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The live API vendors the session layer can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    /// Google Gemini Live: JSON frames, setup sent on open, `setupComplete` marks ready.
    Gemini,
    /// Alibaba Qwen-Omni realtime: JSON frames, waits for `session.created`.
    Qwen,
    /// OpenAI Realtime: JSON frames, waits for `session.created`.
    #[serde(rename = "openai")]
    OpenAI,
    /// ByteDance Doubao realtime dialog: binary frames, two round trips.
    Doubao,
}

impl Vendor {
    pub const ALL: [Vendor; 4] = [Vendor::Gemini, Vendor::Qwen, Vendor::OpenAI, Vendor::Doubao];

    /// The provider name reported on sessions and in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Vendor::Gemini => "gemini",
            Vendor::Qwen => "qwen",
            Vendor::OpenAI => "openai",
            Vendor::Doubao => "doubao",
        }
    }

    /// Whether the vendor frames its protocol in binary packets rather than JSON text.
    pub fn is_binary(&self) -> bool {
        matches!(self, Vendor::Doubao)
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Vendor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Vendor::Gemini),
            "qwen" | "dashscope" => Ok(Vendor::Qwen),
            "openai" => Ok(Vendor::OpenAI),
            "doubao" | "volcengine" => Ok(Vendor::Doubao),
            other => Err(format!("'{other}' is not a supported live vendor")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_parse_aliases() {
        assert_eq!("Gemini".parse::<Vendor>(), Ok(Vendor::Gemini));
        assert_eq!(" dashscope ".parse::<Vendor>(), Ok(Vendor::Qwen));
        assert_eq!("openai".parse::<Vendor>(), Ok(Vendor::OpenAI));
        assert_eq!("volcengine".parse::<Vendor>(), Ok(Vendor::Doubao));
        assert!("azure".parse::<Vendor>().is_err());
    }

    #[test]
    fn test_vendor_display_matches_name() {
        for vendor in Vendor::ALL {
            assert_eq!(vendor.to_string(), vendor.name());
        }
        assert!(Vendor::Doubao.is_binary());
        assert!(!Vendor::OpenAI.is_binary());
    }
}
