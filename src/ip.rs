//! IPv4 address parsing and formatting.

use std::net::Ipv4Addr;

use crate::error::AddressError;

/// Parse an IPv4 address into its 32-bit integer form.
///
/// Accepts a strict dotted quad (`1.2.3.4`, four decimal octets in
/// `0..=255`, leading zeros allowed) or a bare decimal integer
/// (`16909060`).
///
/// # Examples
/// ```
/// use xdb::ip::parse_ip;
///
/// assert_eq!(parse_ip("1.2.3.4").unwrap(), 0x01020304);
/// assert_eq!(parse_ip("16777216").unwrap(), 0x01000000);
/// assert!(parse_ip("1.2.3.x").is_err());
/// ```
pub fn parse_ip(s: &str) -> Result<u32, AddressError> {
    let s = s.trim();

    if !s.contains('.') {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AddressError::InvalidInteger(s.to_string()));
        }
        return s
            .parse::<u32>()
            .map_err(|_| AddressError::InvalidInteger(s.to_string()));
    }

    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() != 4 {
        return Err(AddressError::OctetCount(parts.len()));
    }

    let mut ip = 0u32;
    for part in parts {
        ip = (ip << 8) | u32::from(parse_octet(part)?);
    }
    Ok(ip)
}

fn parse_octet(part: &str) -> Result<u8, AddressError> {
    if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AddressError::InvalidOctet(part.to_string()));
    }
    part.parse::<u8>()
        .map_err(|_| AddressError::InvalidOctet(part.to_string()))
}

/// Format a 32-bit address as a dotted quad.
pub fn long2ip(ip: u32) -> String {
    Ipv4Addr::from(ip).to_string()
}

/// Midpoint of an inclusive address range, without overflow.
pub fn mid_ip(start: u32, end: u32) -> u32 {
    start + (end - start) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotted_quad() {
        assert_eq!(parse_ip("0.0.0.0").unwrap(), 0);
        assert_eq!(parse_ip("255.255.255.255").unwrap(), u32::MAX);
        assert_eq!(parse_ip("1.2.3.4").unwrap(), 0x01020304);
        assert_eq!(parse_ip(" 10.0.0.1 ").unwrap(), 0x0A000001);
        assert_eq!(parse_ip("001.002.003.004").unwrap(), 0x01020304);
    }

    #[test]
    fn test_parse_integer_form() {
        assert_eq!(parse_ip("0").unwrap(), 0);
        assert_eq!(parse_ip("16777215").unwrap(), 0x00FF_FFFF);
        assert_eq!(parse_ip("4294967295").unwrap(), u32::MAX);
        assert!(matches!(
            parse_ip("4294967296"),
            Err(AddressError::InvalidInteger(_))
        ));
        assert!(matches!(parse_ip(""), Err(AddressError::InvalidInteger(_))));
        assert!(matches!(parse_ip("-1"), Err(AddressError::InvalidInteger(_))));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(parse_ip("1.2.3"), Err(AddressError::OctetCount(3)));
        assert_eq!(parse_ip("1.2.3.4.5"), Err(AddressError::OctetCount(5)));
        assert!(matches!(parse_ip("1.2.3.x"), Err(AddressError::InvalidOctet(_))));
        assert!(matches!(parse_ip("1.2.3.256"), Err(AddressError::InvalidOctet(_))));
        assert!(matches!(parse_ip("1..3.4"), Err(AddressError::InvalidOctet(_))));
        assert!(matches!(parse_ip("1.2.3.+4"), Err(AddressError::InvalidOctet(_))));
        assert!(matches!(parse_ip("1.2.3.0004"), Err(AddressError::InvalidOctet(_))));
    }

    #[test]
    fn test_long2ip() {
        assert_eq!(long2ip(0), "0.0.0.0");
        assert_eq!(long2ip(0x01020304), "1.2.3.4");
        assert_eq!(long2ip(u32::MAX), "255.255.255.255");
    }

    #[test]
    fn test_mid_ip() {
        assert_eq!(mid_ip(0, u32::MAX), 0x7FFF_FFFF);
        assert_eq!(mid_ip(10, 10), 10);
    }
}
