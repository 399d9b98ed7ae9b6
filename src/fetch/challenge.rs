use regex::RegexSet;

/// Recognizes anti-bot verification pages
pub trait ChallengeDetector: Send + Sync {
    fn is_challenge(&self, body: &str) -> bool;
}

const CHALLENGE_PATTERNS: &[&str] = &[
    r"(?i)prove\s+you'?re\s+human",
    r"(?i)verify\s+you'?re\s+not\s+a\s+robot",
    r"(?i)complete\s+the\s+captcha",
    r"(?i)security\s+check",
    r"(?i)/sorry/image",
    r"(?i)recaptcha",
    r"(?i)hcaptcha",
    r#"(?i)<img[^>]+src=["']data:image/png;base64"#,
    r#"(?i)<iframe[^>]+src=["'][^"']*recaptcha"#,
];

/// Pattern-based detector covering the common CAPTCHA interstitials
pub struct RegexChallengeDetector {
    patterns: RegexSet,
}

impl RegexChallengeDetector {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: RegexSet::new(CHALLENGE_PATTERNS)?,
        })
    }
}

impl ChallengeDetector for RegexChallengeDetector {
    fn is_challenge(&self, body: &str) -> bool {
        !body.is_empty() && self.patterns.is_match(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> RegexChallengeDetector {
        RegexChallengeDetector::new().unwrap()
    }

    #[test]
    fn test_detects_common_challenges() {
        let d = detector();
        assert!(d.is_challenge("<p>Please prove you're human</p>"));
        assert!(d.is_challenge("Verify you're not a robot"));
        assert!(d.is_challenge("<form action=\"/sorry/index\"><img src=\"/sorry/image?id=1\">"));
        assert!(d.is_challenge("<div class=\"g-recaptcha\"></div>"));
        assert!(d.is_challenge("<script src=\"https://hcaptcha.com/1/api.js\"></script>"));
        assert!(d.is_challenge("<img alt=\"x\" src=\"data:image/png;base64,iVBOR\">"));
        assert!(d.is_challenge("Our systems ran a SECURITY CHECK on your request"));
    }

    #[test]
    fn test_ordinary_pages_pass() {
        let d = detector();
        assert!(!d.is_challenge(""));
        assert!(!d.is_challenge("<div class=\"gs_ri\"><h3>Deep learning</h3></div>"));
        assert!(!d.is_challenge("<img src=\"/logo.png\">"));
    }
}
