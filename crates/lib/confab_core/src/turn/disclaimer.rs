//! Sourcing disclaimer policy.

use std::str::FromStr;

/// Two-line notice appended when a reply is based on the reference manual.
pub const DISCLAIMER: &str = "NOTICE: Generated from the IRPF 2025 questions-and-answers reference manual.\nNOTICE: For correct interpretation, consult your accountant.";

/// When the disclaimer is appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisclaimerPolicy {
    /// Only when a qualifying citation was detected.
    #[default]
    Auto,
    /// On every completed reply.
    Always,
}

impl DisclaimerPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisclaimerPolicy::Auto => "auto",
            DisclaimerPolicy::Always => "always",
        }
    }
}

impl std::fmt::Display for DisclaimerPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisclaimerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(DisclaimerPolicy::Auto),
            "always" => Ok(DisclaimerPolicy::Always),
            other => Err(format!("unknown disclaimer policy: {other}")),
        }
    }
}

/// Appends the disclaimer to `reply` when the policy asks for it. One
/// instance at most, however many citations were found. Returns whether it
/// was appended.
pub fn apply(reply: &mut String, policy: DisclaimerPolicy, cited: bool) -> bool {
    if policy != DisclaimerPolicy::Always && !cited {
        return false;
    }
    reply.push_str("\n\n");
    reply.push_str(DISCLAIMER);
    true
}
