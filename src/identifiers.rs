//! Partition-qualified device resource identifiers.
//!
//! iControl REST addresses objects as `~{partition}~{name}` path segments.
//! Every function here is pure: the same inputs always give the same path,
//! and distinct inputs never collide.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Partition used when the caller doesn't name one.
pub const DEFAULT_PARTITION: &str = "Common";

/// Bytes escaped by [`encode_component`]: everything except
/// `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a single path segment or query value, UTF-8 bytes as `%XX`.
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, COMPONENT).to_string()
}

/// `~{partition}~{name}`, encoded for use as a path segment.
pub fn qualified(partition: &str, name: &str) -> String {
    encode_component(&format!("~{partition}~{name}"))
}

/// Member key `~{partition}~{address}:{port}`, encoded.
pub fn member_id(partition: &str, address: &str, port: u16) -> String {
    encode_component(&format!("~{partition}~{address}:{port}"))
}

/// Path of the pool resource, relative to the traffic-management namespace.
pub fn pool_path(partition: &str, pool: &str) -> String {
    format!("/pool/{}", qualified(partition, pool))
}

/// Path of a pool's member collection.
pub fn pool_members_path(partition: &str, pool: &str) -> String {
    format!("{}/members", pool_path(partition, pool))
}

/// Path of one pool member.
pub fn member_path(partition: &str, pool: &str, address: &str, port: u16) -> String {
    format!(
        "{}/{}",
        pool_members_path(partition, pool),
        member_id(partition, address, port)
    )
}

/// Path of a virtual server.
pub fn virtual_path(partition: &str, name: &str) -> String {
    format!("/virtual/{}", qualified(partition, name))
}

/// `options=range,...` query for the log endpoints: `{start}--{end}`, encoded.
pub fn log_range_query(start: &str, end: &str) -> String {
    format!("options=range,{}", encode_component(&format!("{start}--{end}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_like_uri_component() {
        assert_eq!(encode_component("web pool"), "web%20pool");
        assert_eq!(encode_component("10.0.0.1:80"), "10.0.0.1%3A80");
        assert_eq!(encode_component("a/b"), "a%2Fb");
        assert_eq!(encode_component("~Common~x"), "~Common~x");
        assert_eq!(encode_component("é"), "%C3%A9");
        assert_eq!(encode_component("!*'()"), "!*'()");
        assert_eq!(encode_component("a&b=c?d#e"), "a%26b%3Dc%3Fd%23e");
    }

    #[test]
    fn member_ids_distinguish_ports() {
        let a = member_path("Common", "pool1", "10.0.0.1", 80);
        let b = member_path("Common", "pool1", "10.0.0.1", 8080);
        assert_ne!(a, b);
        assert_eq!(a, "/pool/~Common~pool1/members/~Common~10.0.0.1%3A80");
    }

    #[test]
    fn member_ids_distinguish_partitions_and_pools() {
        let base = member_path("Common", "pool1", "10.0.0.1", 80);
        assert_ne!(base, member_path("Tenant", "pool1", "10.0.0.1", 80));
        assert_ne!(base, member_path("Common", "pool2", "10.0.0.1", 80));
        assert_ne!(base, member_path("Common", "pool1", "10.0.0.2", 80));
    }

    #[test]
    fn identifiers_are_deterministic() {
        assert_eq!(
            member_path("Common", "p", "::1", 443),
            member_path("Common", "p", "::1", 443)
        );
    }

    #[test]
    fn partition_qualified_paths() {
        assert_eq!(pool_path("Common", "web1"), "/pool/~Common~web1");
        assert_eq!(virtual_path("Tenant", "vs 1"), "/virtual/~Tenant~vs%201");
    }

    #[test]
    fn range_query() {
        assert_eq!(
            log_range_query("2025-05-30T00:00:00Z", "2025-05-30T15:00:00Z"),
            "options=range,2025-05-30T00%3A00%3A00Z--2025-05-30T15%3A00%3A00Z"
        );
    }
}
