//! Embedded navigation sub-protocol.
//!
//! The completion service may place a literal JSON object of the shape
//! `{"action": "navigate", "section": "<id>"}` anywhere inside a reply. The
//! scan is a whitespace-tolerant substring match, not a full JSON parse, and
//! the first match wins. The section value is passed through unvalidated;
//! the dispatcher decides whether it names a real section.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Navigate { section: String },
}

static NAVIGATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\{\s*"action"\s*:\s*"navigate"\s*,\s*"section"\s*:\s*"([^"]+)"\s*\}"#)
        .expect("navigate pattern compiles")
});

/// Extract the first navigation directive from a raw reply, if any. The
/// reply itself is left untouched; a `None` means the caller should display
/// it verbatim.
pub fn parse_directive(reply: &str) -> Option<Directive> {
    NAVIGATE_RE.captures(reply).map(|caps| Directive::Navigate {
        section: caps[1].to_string(),
    })
}

/// The templated confirmation shown in place of a raw directive reply.
pub fn confirmation_text(section: &str) -> String {
    format!("Sure! Taking you to the {section} section.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_bare_directive() {
        let reply = r#"{"action": "navigate", "section": "projects"}"#;
        assert_eq!(
            parse_directive(reply),
            Some(Directive::Navigate {
                section: "projects".to_string()
            })
        );
    }

    #[test]
    fn test_parses_directive_embedded_in_prose() {
        let reply = r#"Of course. {"action": "navigate", "section": "contact"} See you there!"#;
        assert_eq!(
            parse_directive(reply),
            Some(Directive::Navigate {
                section: "contact".to_string()
            })
        );
    }

    #[test]
    fn test_whitespace_tolerant() {
        let reply = "{ \"action\" :\n\"navigate\" ,\t\"section\" : \"about\" }";
        assert_eq!(
            parse_directive(reply),
            Some(Directive::Navigate {
                section: "about".to_string()
            })
        );
    }

    #[test]
    fn test_first_match_wins() {
        let reply = concat!(
            r#"{"action": "navigate", "section": "skills"}"#,
            " and also ",
            r#"{"action": "navigate", "section": "hero"}"#,
        );
        assert_eq!(
            parse_directive(reply),
            Some(Directive::Navigate {
                section: "skills".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_section_still_parses() {
        // Validation is deferred to the dispatcher.
        let reply = r#"{"action": "navigate", "section": "basement"}"#;
        assert_eq!(
            parse_directive(reply),
            Some(Directive::Navigate {
                section: "basement".to_string()
            })
        );
    }

    #[test]
    fn test_near_misses_are_ignored() {
        assert_eq!(parse_directive("plain text reply"), None);
        assert_eq!(
            parse_directive(r#"{"action": "scroll", "section": "about"}"#),
            None
        );
        assert_eq!(
            parse_directive(r#"{"section": "about", "action": "navigate"}"#),
            None
        );
        assert_eq!(
            parse_directive(r#"{"action": "navigate", "section": ""}"#),
            None
        );
    }

    #[test]
    fn test_confirmation_text() {
        assert_eq!(
            confirmation_text("projects"),
            "Sure! Taking you to the projects section."
        );
    }
}
