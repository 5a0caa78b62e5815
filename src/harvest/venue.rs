//! Venue classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Publication venues the harvester keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Venue {
    Acl,
    Naacl,
    Eacl,
    Emnlp,
    Conll,
    Coling,
    Lrec,
    Findings,
}

impl Venue {
    /// Look up one raw venue identifier, case-insensitively.
    pub fn from_id(id: &str) -> Option<Venue> {
        match id.to_lowercase().as_str() {
            "acl" => Some(Venue::Acl),
            "naacl" => Some(Venue::Naacl),
            "eacl" => Some(Venue::Eacl),
            "emnlp" => Some(Venue::Emnlp),
            "conll" => Some(Venue::Conll),
            "coling" => Some(Venue::Coling),
            "lrec" => Some(Venue::Lrec),
            "findings" | "acl-findings" => Some(Venue::Findings),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Acl => "ACL",
            Venue::Naacl => "NAACL",
            Venue::Eacl => "EACL",
            Venue::Emnlp => "EMNLP",
            Venue::Conll => "CONLL",
            Venue::Coling => "COLING",
            Venue::Lrec => "LREC",
            Venue::Findings => "FINDINGS",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First identifier (in the given order) that names a known venue wins.
pub fn classify<I, S>(ids: I) -> Option<Venue>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter().find_map(|id| Venue::from_id(id.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_ids() {
        assert_eq!(Venue::from_id("acl"), Some(Venue::Acl));
        assert_eq!(Venue::from_id("CoNLL"), Some(Venue::Conll));
        assert_eq!(Venue::from_id("LREC"), Some(Venue::Lrec));
        assert_eq!(Venue::from_id("acl-findings"), Some(Venue::Findings));
        assert_eq!(Venue::from_id("findings"), Some(Venue::Findings));
    }

    #[test]
    fn test_unknown_ids() {
        assert_eq!(Venue::from_id("ws"), None);
        assert_eq!(Venue::from_id(""), None);
        // Lookup is exact after lower-casing, not substring based.
        assert_eq!(Venue::from_id("acl-long"), None);
        assert_eq!(Venue::from_id(" acl"), None);
    }

    #[test]
    fn test_first_match_wins() {
        assert_eq!(classify(["ws", "emnlp", "acl"]), Some(Venue::Emnlp));
        assert_eq!(classify(["acl", "emnlp"]), Some(Venue::Acl));
        assert_eq!(
            classify(vec!["semeval".to_string(), "acl-findings".to_string()]),
            Some(Venue::Findings)
        );
    }

    #[test]
    fn test_no_match() {
        assert_eq!(classify(Vec::<String>::new()), None);
        assert_eq!(classify(["ws", "semeval"]), None);
    }

    #[test]
    fn test_serializes_as_uppercase_tag() {
        assert_eq!(serde_json::to_string(&Venue::Conll).unwrap(), "\"CONLL\"");
        assert_eq!(serde_json::to_string(&Venue::Findings).unwrap(), "\"FINDINGS\"");
        let parsed: Venue = serde_json::from_str("\"NAACL\"").unwrap();
        assert_eq!(parsed, Venue::Naacl);
        assert_eq!(Venue::Emnlp.to_string(), "EMNLP");
    }
}
