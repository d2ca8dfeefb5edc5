//! Network ranges in CIDR notation.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// An IPv4 or IPv6 network, e.g. `10.0.0.0/8` or `fd00::/8`.
///
/// A bare address parses as a single-host network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpNetwork {
    base: IpAddr,
    prefix: u8,
}

/// Rejected network range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid network range '{0}'")]
pub struct InvalidNetwork(pub String);

impl IpNetwork {
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self, InvalidNetwork> {
        let max = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix > max {
            return Err(InvalidNetwork(format!("{addr}/{prefix}")));
        }
        Ok(Self {
            base: mask(addr, prefix),
            prefix,
        })
    }

    /// Whether `addr` lies inside this network.
    ///
    /// IPv4-mapped IPv6 peers (`::ffff:a.b.c.d`) are compared as IPv4.
    pub fn contains(&self, addr: IpAddr) -> bool {
        let addr = addr.to_canonical();
        match (self.base, addr) {
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {
                mask(addr, self.prefix) == self.base
            }
            _ => false,
        }
    }
}

fn mask(addr: IpAddr, prefix: u8) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => {
            let bits = u32::from(v4);
            let masked = if prefix == 0 { 0 } else { bits & (u32::MAX << (32 - prefix)) };
            IpAddr::V4(Ipv4Addr::from(masked))
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(v6);
            let masked = if prefix == 0 { 0 } else { bits & (u128::MAX << (128 - prefix)) };
            IpAddr::V6(Ipv6Addr::from(masked))
        }
    }
}

impl FromStr for IpNetwork {
    type Err = InvalidNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || InvalidNetwork(s.to_string());
        match s.split_once('/') {
            Some((addr, prefix)) => {
                let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
                let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
                Self::new(addr, prefix).map_err(|_| invalid())
            }
            None => {
                let addr: IpAddr = s.parse().map_err(|_| invalid())?;
                let prefix = if addr.is_ipv4() { 32 } else { 128 };
                Self::new(addr, prefix)
            }
        }
    }
}

impl fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn ipv4_ranges() {
        let net: IpNetwork = "127.0.0.1/24".parse().unwrap();
        assert_eq!(net.to_string(), "127.0.0.0/24");
        assert!(net.contains(ip("127.0.0.1")));
        assert!(net.contains(ip("127.0.0.254")));
        assert!(!net.contains(ip("127.0.1.1")));
        assert!(!net.contains(ip("::1")));
    }

    #[test]
    fn ipv6_ranges_and_mapped_peers() {
        let v6: IpNetwork = "fd00::/8".parse().unwrap();
        assert!(v6.contains(ip("fd12:3456::1")));
        assert!(!v6.contains(ip("fe80::1")));

        let v4: IpNetwork = "10.0.0.0/8".parse().unwrap();
        assert!(v4.contains(ip("::ffff:10.9.8.7")));
    }

    #[test]
    fn bare_address_is_single_host() {
        let net: IpNetwork = "192.168.1.10".parse().unwrap();
        assert!(net.contains(ip("192.168.1.10")));
        assert!(!net.contains(ip("192.168.1.11")));
    }

    #[test]
    fn zero_prefix_matches_family() {
        let all: IpNetwork = "0.0.0.0/0".parse().unwrap();
        assert!(all.contains(ip("203.0.113.9")));
        assert!(!all.contains(ip("2001:db8::1")));
    }

    #[test]
    fn rejects_garbage() {
        assert!("10.0.0.0/33".parse::<IpNetwork>().is_err());
        assert!("not-an-ip".parse::<IpNetwork>().is_err());
        assert!("10.0.0.0/x".parse::<IpNetwork>().is_err());
    }
}
