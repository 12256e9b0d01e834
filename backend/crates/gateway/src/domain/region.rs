//! Upstream Regions
//!
//! Closed set of platform routing values served by the upstream API.

use std::fmt;
use std::str::FromStr;

/// Supported upstream region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Br1,
    Eun1,
    Euw1,
    Jp1,
    Kr,
    La1,
    La2,
    Na1,
    Oc1,
    Ph2,
    Ru,
    Sg2,
    Th2,
    Tr1,
    Tw2,
    Vn2,
}

impl Region {
    pub const ALL: [Region; 16] = [
        Region::Br1,
        Region::Eun1,
        Region::Euw1,
        Region::Jp1,
        Region::Kr,
        Region::La1,
        Region::La2,
        Region::Na1,
        Region::Oc1,
        Region::Ph2,
        Region::Ru,
        Region::Sg2,
        Region::Th2,
        Region::Tr1,
        Region::Tw2,
        Region::Vn2,
    ];

    /// Lowercase code as used in hostnames and paths
    pub const fn as_str(&self) -> &'static str {
        match self {
            Region::Br1 => "br1",
            Region::Eun1 => "eun1",
            Region::Euw1 => "euw1",
            Region::Jp1 => "jp1",
            Region::Kr => "kr",
            Region::La1 => "la1",
            Region::La2 => "la2",
            Region::Na1 => "na1",
            Region::Oc1 => "oc1",
            Region::Ph2 => "ph2",
            Region::Ru => "ru",
            Region::Sg2 => "sg2",
            Region::Th2 => "th2",
            Region::Tr1 => "tr1",
            Region::Tw2 => "tw2",
            Region::Vn2 => "vn2",
        }
    }

    /// Upstream hostname for this region
    pub fn host(&self, base_domain: &str) -> String {
        format!("{}.{}", self.as_str(), base_domain)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown region: {0}")]
pub struct UnknownRegion(pub String);

impl FromStr for Region {
    type Err = UnknownRegion;

    /// Case-insensitive match against the region codes
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .into_iter()
            .find(|region| region.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownRegion(s.to_string()))
    }
}
