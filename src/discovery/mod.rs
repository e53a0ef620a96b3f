// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Discovery Module
 * Subdomain discovery for the site mapper
 *
 * © 2026 Bountyy Oy
 */
pub mod subdomain_discovery;

pub use subdomain_discovery::{
    DiscoveredSubdomain, DiscoveryConfig, DiscoverySource, SubdomainDiscovery, SubdomainReport,
};
