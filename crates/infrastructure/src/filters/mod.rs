pub mod static_blocklist;
pub mod static_policy;

pub use static_blocklist::StaticBlocklist;
pub use static_policy::StaticPolicyEngine;

/// Lowercase, no surrounding whitespace, no trailing dot, no `*.` prefix.
pub(crate) fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim();
    let domain = domain.strip_prefix("*.").unwrap_or(domain);
    domain.trim_end_matches('.').to_ascii_lowercase()
}

/// The domain itself followed by each parent: `a.b.c`, `b.c`, `c`.
pub(crate) fn domain_suffixes(domain: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(domain), |d| d.split_once('.').map(|(_, parent)| parent))
        .filter(|d| !d.is_empty())
}
