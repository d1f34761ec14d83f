//! Deduplication engine. Collapses raw candidates from every hunter into one
//! canonical record per real-world entity, despite there being no reliable
//! global identifier. Matching is keyed on normalized derived strings; the
//! key check order is a fixed tie-break policy and must stay stable so runs
//! are reproducible.

use std::collections::HashMap;

use tracing::debug;

use leadscope_common::{
    email_domain, normalize_location, normalize_name, website_domain, CandidateRecord,
    CanonicalRecord,
};

/// Free-mail providers whose email domain says nothing about entity identity.
const FREEMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "aol.com",
    "icloud.com",
];

/// Match key kinds, in check order. First hit wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    NameCity,
    WebsiteDomain,
    EmailDomain,
    Phone,
    NameAddress,
    /// Fallback when a candidate has no structured fields at all. Reduced
    /// precision: exact normalized-name equality only.
    NameOnly,
}

struct DedupKey {
    kind: KeyKind,
    value: String,
}

fn key(kind: KeyKind, value: String) -> DedupKey {
    DedupKey { kind, value }
}

/// Derive up to five match keys for a candidate, in the fixed check order.
fn dedup_keys(c: &CandidateRecord) -> Vec<DedupKey> {
    let name = normalize_name(&c.name);
    let mut keys = Vec::new();

    if let Some(city) = c.city.as_deref() {
        let city = normalize_location(city);
        if !city.is_empty() {
            keys.push(key(KeyKind::NameCity, format!("name+city:{name}|{city}")));
        }
    }
    if let Some(domain) = c.website.as_deref().and_then(website_domain) {
        keys.push(key(KeyKind::WebsiteDomain, format!("domain:{domain}")));
    }
    if let Some(domain) = c.email.as_deref().and_then(email_domain) {
        if !FREEMAIL_DOMAINS.contains(&domain.as_str()) {
            keys.push(key(KeyKind::EmailDomain, format!("email-domain:{domain}")));
        }
    }
    if let Some(phone) = c.phone.as_deref() {
        if !phone.is_empty() {
            keys.push(key(KeyKind::Phone, format!("phone:{phone}")));
        }
    }
    if let Some(address) = c.address.as_deref() {
        let address = normalize_location(address);
        if !address.is_empty() {
            keys.push(key(
                KeyKind::NameAddress,
                format!("name+addr:{name}|{address}"),
            ));
        }
    }

    if keys.is_empty() {
        keys.push(key(KeyKind::NameOnly, format!("name:{name}")));
    }
    keys
}

/// Composite identity used by the final reduction: name+city+region+domain+
/// phone, skipping absent parts. Collapses records that survived under two
/// output positions because their key sets never intersected.
fn composite_identity(r: &CanonicalRecord) -> String {
    let mut parts = Vec::new();

    let name = normalize_name(&r.name);
    if !name.is_empty() {
        parts.push(name);
    }
    if let Some(city) = r.city.as_deref() {
        let city = normalize_location(city);
        if !city.is_empty() {
            parts.push(city);
        }
    }
    if let Some(region) = r.region.as_deref() {
        let region = normalize_location(region);
        if !region.is_empty() {
            parts.push(region);
        }
    }
    if let Some(domain) = r
        .website
        .as_deref()
        .and_then(website_domain)
        .or_else(|| r.email.as_deref().and_then(email_domain))
    {
        parts.push(domain);
    }
    if let Some(phone) = r.phone.as_deref() {
        if !phone.is_empty() {
            parts.push(phone.to_string());
        }
    }

    if parts.is_empty() {
        "unknown".to_string()
    } else {
        parts.join("|")
    }
}

#[derive(Debug)]
pub struct DedupOutcome {
    pub records: Vec<CanonicalRecord>,
    pub duplicates_removed: u32,
    /// Merges whose only identity evidence was a shared phone number.
    pub low_confidence_merges: u32,
}

/// Deduplicate a batch of candidates into canonical records.
///
/// For each candidate, its keys are checked in order against everything seen
/// so far; the first hit determines the match. On a hit the candidate is
/// merged into the surviving record and ALL of its keys are registered
/// against that record, so transitively-equivalent identities collapse in
/// later lookups. A final pass reduces by composite identity.
pub fn deduplicate(candidates: Vec<CandidateRecord>) -> DedupOutcome {
    let mut slots: Vec<CanonicalRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut duplicates_removed = 0u32;
    let mut low_confidence_merges = 0u32;

    for candidate in candidates {
        let keys = dedup_keys(&candidate);
        let hit = keys
            .iter()
            .find_map(|k| index.get(&k.value).map(|&slot| (k.kind, slot)));

        match hit {
            Some((kind, slot)) => {
                // A phone hit with no corroborating key is the weakest match:
                // shared office lines routinely join distinct businesses.
                let phone_only = kind == KeyKind::Phone
                    && keys
                        .iter()
                        .filter(|k| k.kind != KeyKind::Phone)
                        .all(|k| index.get(&k.value) != Some(&slot));

                debug!(
                    name = candidate.name.as_str(),
                    matched_kind = ?kind,
                    phone_only,
                    "Merging duplicate candidate"
                );
                slots[slot].absorb(&candidate);
                if phone_only {
                    slots[slot].needs_review = true;
                    low_confidence_merges += 1;
                }
                duplicates_removed += 1;
                for k in keys {
                    index.insert(k.value, slot);
                }
            }
            None => {
                let slot = slots.len();
                slots.push(CanonicalRecord::from(candidate));
                for k in keys {
                    index.insert(k.value, slot);
                }
            }
        }
    }

    // Final reduction by composite identity.
    let mut by_identity: HashMap<String, usize> = HashMap::new();
    let mut records: Vec<CanonicalRecord> = Vec::new();
    for record in slots {
        let identity = composite_identity(&record);
        match by_identity.get(&identity) {
            Some(&i) => {
                records[i].absorb_record(&record);
                duplicates_removed += 1;
            }
            None => {
                by_identity.insert(identity, records.len());
                records.push(record);
            }
        }
    }

    DedupOutcome {
        records,
        duplicates_removed,
        low_confidence_merges,
    }
}
