//! Field normalization used by hunters before returning candidates and by the
//! dedup engine when deriving match keys. All comparisons in the pipeline run
//! on normalized values; raw source formatting is never trusted.

/// Legal-entity suffixes stripped from business names before comparison.
const LEGAL_SUFFIXES: &[&str] = &[
    "incorporated",
    "inc",
    "corporation",
    "corp",
    "limited",
    "ltd",
    "llc",
    "llp",
    "co",
];

/// Leading articles stripped from business names.
const LEADING_ARTICLES: &[&str] = &["the", "a", "an"];

/// Normalize a business name for dedup comparison: lowercase, strip
/// punctuation, collapse whitespace, strip legal-entity suffixes and
/// leading articles.
pub fn normalize_name(name: &str) -> String {
    let lowered: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let mut words: Vec<&str> = lowered.split_whitespace().collect();

    while let Some(first) = words.first() {
        if LEADING_ARTICLES.contains(first) && words.len() > 1 {
            words.remove(0);
        } else {
            break;
        }
    }

    while let Some(last) = words.last() {
        if LEGAL_SUFFIXES.contains(last) && words.len() > 1 {
            words.pop();
        } else {
            break;
        }
    }

    words.join(" ")
}

/// Normalize free-form location text (city, address): lowercase, strip
/// punctuation, collapse whitespace.
pub fn normalize_location(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a phone number to bare digits. Strips a leading country code 1
/// from 11-digit numbers. Returns `None` for anything with fewer than 7
/// digits (extensions, fragments, placeholder text).
pub fn normalize_phone(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = if digits.len() == 11 && digits.starts_with('1') {
        digits[1..].to_string()
    } else {
        digits
    };
    if digits.len() < 7 {
        return None;
    }
    Some(digits)
}

/// Normalize an email address: trim and lowercase. Returns `None` when the
/// value is not a plausible address (exactly one `@` with a dotted domain).
pub fn normalize_email(email: &str) -> Option<String> {
    let trimmed = email.trim().to_lowercase();
    let (local, domain) = trimmed.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return None;
    }
    if domain.starts_with('.') || domain.ends_with('.') {
        return None;
    }
    Some(trimmed)
}

/// The domain of an email address, if the address is well formed.
pub fn email_domain(email: &str) -> Option<String> {
    let normalized = normalize_email(email)?;
    normalized.split_once('@').map(|(_, d)| d.to_string())
}

/// Extract the registrable domain from a URL, dropping any `www.` prefix
/// (e.g. "https://www.example.com/about" -> "example.com").
pub fn website_domain(website: &str) -> Option<String> {
    let host = website
        .split("://")
        .nth(1)
        .unwrap_or(website)
        .split('/')
        .next()
        .unwrap_or("")
        .split(':')
        .next()
        .unwrap_or("")
        .to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if host.is_empty() || !host.contains('.') {
        return None;
    }
    Some(host.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_strips_suffix_and_article() {
        assert_eq!(normalize_name("The Acme Widget Co."), "acme widget");
        assert_eq!(normalize_name("Acme Widget, Inc."), "acme widget");
        assert_eq!(normalize_name("ACME   WIDGET LLC"), "acme widget");
    }

    #[test]
    fn name_strips_stacked_suffixes() {
        assert_eq!(normalize_name("Apex Holdings Co Ltd"), "apex holdings");
    }

    #[test]
    fn name_survives_suffix_only_input() {
        // A name that IS a legal suffix must not normalize to nothing.
        assert_eq!(normalize_name("Inc"), "inc");
        assert_eq!(normalize_name("The Co"), "co");
    }

    #[test]
    fn phone_normalizes_common_formats() {
        assert_eq!(
            normalize_phone("(512) 555-0100").as_deref(),
            Some("5125550100")
        );
        assert_eq!(
            normalize_phone("+1 512 555 0100").as_deref(),
            Some("5125550100")
        );
        assert_eq!(
            normalize_phone("512.555.0100").as_deref(),
            Some("5125550100")
        );
    }

    #[test]
    fn phone_rejects_fragments() {
        assert_eq!(normalize_phone("ext 123"), None);
        assert_eq!(normalize_phone(""), None);
    }

    #[test]
    fn email_validates_shape() {
        assert_eq!(
            normalize_email("  Sales@Example.COM ").as_deref(),
            Some("sales@example.com")
        );
        assert_eq!(normalize_email("not-an-email"), None);
        assert_eq!(normalize_email("a@b"), None);
        assert_eq!(normalize_email("@example.com"), None);
    }

    #[test]
    fn website_domain_strips_scheme_path_and_www() {
        assert_eq!(
            website_domain("https://www.example.com/about").as_deref(),
            Some("example.com")
        );
        assert_eq!(
            website_domain("example.com:8080/x").as_deref(),
            Some("example.com")
        );
        assert_eq!(website_domain("not a url"), None);
    }

    #[test]
    fn email_domain_extracts() {
        assert_eq!(
            email_domain("sales@acme.example.com").as_deref(),
            Some("acme.example.com")
        );
        assert_eq!(email_domain("broken"), None);
    }
}
