use fancy_regex::Regex;
use horizon_dns_domain::PatternError;

/// Adblock-style rules converted to anchored regexes at insert time.
///
/// Comment lines (`!`, `[`), blank lines and whitelist (`@@`) rules are
/// recognized during conversion and simply not inserted.
#[derive(Default)]
pub struct GfwList {
    patterns: Vec<Regex>,
}

impl GfwList {
    pub fn insert(&mut self, pattern: &str) -> Result<(), PatternError> {
        let Some(converted) = convert_rule(pattern) else {
            return Ok(());
        };
        let regex = Regex::new(&converted)
            .map_err(|e| PatternError::Regex(pattern.to_string(), e.to_string()))?;
        self.patterns.push(regex);
        Ok(())
    }

    pub fn has(&self, domain: &str) -> bool {
        self.patterns
            .iter()
            .any(|r| r.is_match(domain).unwrap_or(false))
    }
}

/// Turn one adblock rule into an equivalent regex. `None` means the line
/// carries no blockable rule (comment, blank, whitelist).
fn convert_rule(line: &str) -> Option<String> {
    if line.is_empty()
        || line.starts_with('!')
        || line.starts_with('[')
        || line.starts_with("@@")
    {
        return None;
    }

    // A line that already is a regex is taken verbatim.
    if line.starts_with('/') {
        return Some(line.to_string());
    }

    let mut rule = line
        .replace('(', r"\(")
        .replace(')', r"\)")
        .replace('.', r"\.")
        .replace('*', ".+");

    let anchor_start = if let Some(rest) = rule.strip_prefix("||") {
        rule = rest.to_string();
        true
    } else if let Some(rest) = rule.strip_prefix('|') {
        rule = rest.to_string();
        true
    } else {
        false
    };
    let anchor_end = if let Some(rest) = rule.strip_suffix('|') {
        rule = rest.to_string();
        true
    } else {
        false
    };

    // Rules often carry a scheme; domains never do.
    for scheme in ["http://", "https://", "//"] {
        if let Some(rest) = rule.strip_prefix(scheme) {
            rule = rest.to_string();
            break;
        }
    }

    Some(match (anchor_start, anchor_end) {
        (true, true) => format!("^{rule}$"),
        (true, false) => format!("^{rule}.*"),
        (false, true) => format!(".*{rule}$"),
        (false, false) => format!(".*{rule}.*"),
    })
}
