//! Fixed IP-to-location table
//!
//! Useful for tests and for running without a GeoIP database.

use std::collections::HashMap;
use std::net::IpAddr;

use super::{GeoError, GeoResolver};
use crate::models::LocationFix;

#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    entries: HashMap<IpAddr, LocationFix>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the fix for `ip`
    pub fn with_entry(mut self, ip: IpAddr, fix: LocationFix) -> Self {
        self.entries.insert(ip, fix);
        self
    }
}

impl GeoResolver for StaticResolver {
    fn resolve(&self, ip: &IpAddr) -> Result<LocationFix, GeoError> {
        self.entries.get(ip).copied().ok_or(GeoError::NotFound)
    }
}
