// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::errors::{ScannerError, ScannerResult};
use crate::types::ScanConfig;

pub const HEADER_SECURITY_TESTER: &str = "HeaderSecurityTester";
pub const REFLECTED_XSS_TESTER: &str = "ReflectedXssTester";
pub const SQL_INJECTION_TESTER: &str = "SqlInjectionTester";
pub const NOSQL_INJECTION_TESTER: &str = "NoSqlInjectionTester";
pub const OPEN_REDIRECT_TESTER: &str = "OpenRedirectTester";

/// Named bundle of concurrency, timeout and rate-limit values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanProfile {
    /// Structure only, passive checks
    Mapping,
    Quick,
    Balanced,
    Intense,
    /// Low and slow
    Stealth,
}

impl ScanProfile {
    pub const ALL: [ScanProfile; 5] = [
        ScanProfile::Mapping,
        ScanProfile::Quick,
        ScanProfile::Balanced,
        ScanProfile::Intense,
        ScanProfile::Stealth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanProfile::Mapping => "mapping",
            ScanProfile::Quick => "quick",
            ScanProfile::Balanced => "balanced",
            ScanProfile::Intense => "intense",
            ScanProfile::Stealth => "stealth",
        }
    }
}

impl Default for ScanProfile {
    fn default() -> Self {
        ScanProfile::Balanced
    }
}

impl fmt::Display for ScanProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ScanProfile {
    type Err = ScannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mapping" | "mapping-only" | "map" => Ok(ScanProfile::Mapping),
            "quick" | "light" | "fast" => Ok(ScanProfile::Quick),
            "balanced" | "normal" => Ok(ScanProfile::Balanced),
            "intense" | "deep" => Ok(ScanProfile::Intense),
            "stealth" => Ok(ScanProfile::Stealth),
            other => Err(ScannerError::InvalidProfile(other.to_string())),
        }
    }
}

/// Which registered testers a profile runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TesterSelection {
    All,
    Only(Vec<String>),
}

impl TesterSelection {
    pub fn only(names: &[&str]) -> Self {
        TesterSelection::Only(names.iter().map(|n| n.to_string()).collect())
    }

    pub fn allows(&self, tester: &str) -> bool {
        match self {
            TesterSelection::All => true,
            TesterSelection::Only(names) => names.iter().any(|n| n == tester),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ProfileSettings {
    #[validate(range(min = 1, max = 1000))]
    pub max_concurrency: usize,

    #[validate(range(min = 1, max = 300))]
    pub timeout_secs: u64,

    #[validate(range(max = 60000))]
    pub rate_limit_interval_ms: u64,

    #[validate(range(max = 20))]
    pub max_depth: usize,

    pub testers: TesterSelection,
}

impl ProfileSettings {
    /// Built-in bindings; callers may override them through `ProfileTable`
    pub fn defaults_for(profile: ScanProfile) -> Self {
        match profile {
            ScanProfile::Mapping => Self {
                max_concurrency: 5,
                timeout_secs: 5,
                rate_limit_interval_ms: 0,
                max_depth: 3,
                testers: TesterSelection::only(&[HEADER_SECURITY_TESTER]),
            },
            ScanProfile::Quick => Self {
                max_concurrency: 20,
                timeout_secs: 5,
                rate_limit_interval_ms: 0,
                max_depth: 2,
                testers: TesterSelection::only(&[
                    HEADER_SECURITY_TESTER,
                    REFLECTED_XSS_TESTER,
                    SQL_INJECTION_TESTER,
                ]),
            },
            ScanProfile::Balanced => Self {
                max_concurrency: 10,
                timeout_secs: 10,
                rate_limit_interval_ms: 0,
                max_depth: 3,
                testers: TesterSelection::All,
            },
            ScanProfile::Intense => Self {
                max_concurrency: 50,
                timeout_secs: 15,
                rate_limit_interval_ms: 0,
                max_depth: 5,
                testers: TesterSelection::All,
            },
            ScanProfile::Stealth => Self {
                max_concurrency: 2,
                timeout_secs: 45,
                rate_limit_interval_ms: 500,
                max_depth: 3,
                testers: TesterSelection::All,
            },
        }
    }

    /// New config with this profile's knobs over `base`
    pub fn apply(&self, base: &ScanConfig) -> ScanConfig {
        ScanConfig {
            max_concurrency: self.max_concurrency,
            timeout_secs: self.timeout_secs,
            rate_limit_interval_ms: self.rate_limit_interval_ms.max(base.rate_limit_interval_ms),
            max_depth: self.max_depth,
            ..base.clone()
        }
    }
}

/// Operator overrides that win over every profile's own values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileLimits {
    pub max_concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
}

/// Profile name -> settings, starting from the built-in bindings
#[derive(Debug, Clone)]
pub struct ProfileTable {
    settings: HashMap<ScanProfile, ProfileSettings>,
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileTable {
    pub fn new() -> Self {
        let settings = ScanProfile::ALL
            .iter()
            .map(|p| (*p, ProfileSettings::defaults_for(*p)))
            .collect();
        Self { settings }
    }

    pub fn get(&self, profile: ScanProfile) -> ProfileSettings {
        self.settings
            .get(&profile)
            .cloned()
            .unwrap_or_else(|| ProfileSettings::defaults_for(profile))
    }

    /// Replace a binding; rejected if out of range
    pub fn set(&mut self, profile: ScanProfile, settings: ProfileSettings) -> ScannerResult<()> {
        settings.validate()?;
        self.settings.insert(profile, settings);
        Ok(())
    }

    /// Apply operator limits to every profile. Unset limits keep the
    /// profile's own value.
    pub fn with_limits(mut self, limits: &ProfileLimits) -> ScannerResult<Self> {
        for profile in ScanProfile::ALL {
            let mut settings = self.get(profile);
            if let Some(max_concurrency) = limits.max_concurrency {
                settings.max_concurrency = max_concurrency;
            }
            if let Some(timeout_secs) = limits.timeout_secs {
                settings.timeout_secs = timeout_secs;
            }
            self.set(profile, settings)?;
        }
        Ok(self)
    }

    /// Look up by operator-supplied name
    pub fn resolve(&self, name: &str) -> ScannerResult<(ScanProfile, ProfileSettings)> {
        let profile: ScanProfile = name.parse()?;
        Ok((profile, self.get(profile)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_aliases() {
        assert_eq!("normal".parse::<ScanProfile>().unwrap(), ScanProfile::Balanced);
        assert_eq!("DEEP".parse::<ScanProfile>().unwrap(), ScanProfile::Intense);
        assert_eq!("light".parse::<ScanProfile>().unwrap(), ScanProfile::Quick);
        assert_eq!("mapping-only".parse::<ScanProfile>().unwrap(), ScanProfile::Mapping);
        assert!(matches!(
            "turbo".parse::<ScanProfile>(),
            Err(ScannerError::InvalidProfile(_))
        ));
    }

    #[test]
    fn test_default_bindings_are_valid() {
        for profile in ScanProfile::ALL {
            assert!(ProfileSettings::defaults_for(profile).validate().is_ok(), "{}", profile);
        }
    }

    #[test]
    fn test_apply_replaces_knobs_only() {
        let base = ScanConfig {
            user_agent: "custom".to_string(),
            auth_token: Some("t".to_string()),
            ..Default::default()
        };
        let applied = ProfileSettings::defaults_for(ScanProfile::Stealth).apply(&base);

        assert_eq!(applied.max_concurrency, 2);
        assert_eq!(applied.timeout_secs, 45);
        assert_eq!(applied.rate_limit_interval_ms, 500);
        assert_eq!(applied.user_agent, "custom");
        assert_eq!(applied.auth_token.as_deref(), Some("t"));
        // Base untouched
        assert_eq!(base.max_concurrency, 50);
    }

    #[test]
    fn test_mapping_profile_selection() {
        let mapping = ProfileSettings::defaults_for(ScanProfile::Mapping);
        assert!(mapping.testers.allows(HEADER_SECURITY_TESTER));
        assert!(!mapping.testers.allows(SQL_INJECTION_TESTER));
        let quick = ProfileSettings::defaults_for(ScanProfile::Quick);
        assert!(quick.testers.allows(SQL_INJECTION_TESTER));
        assert!(!quick.testers.allows(OPEN_REDIRECT_TESTER));
        assert!(ProfileSettings::defaults_for(ScanProfile::Intense)
            .testers
            .allows("AnythingElse"));
    }

    #[test]
    fn test_override_validation() {
        let mut table = ProfileTable::new();
        let mut settings = table.get(ScanProfile::Quick);
        settings.max_concurrency = 0;
        assert!(table.set(ScanProfile::Quick, settings.clone()).is_err());

        settings.max_concurrency = 7;
        table.set(ScanProfile::Quick, settings).unwrap();
        let (profile, resolved) = table.resolve("fast").unwrap();
        assert_eq!(profile, ScanProfile::Quick);
        assert_eq!(resolved.max_concurrency, 7);
    }

    #[test]
    fn test_limits_override_every_profile() {
        let table = ProfileTable::new()
            .with_limits(&ProfileLimits {
                max_concurrency: Some(3),
                timeout_secs: None,
            })
            .unwrap();

        for profile in ScanProfile::ALL {
            let settings = table.get(profile);
            assert_eq!(settings.max_concurrency, 3, "{}", profile);
            assert_eq!(
                settings.timeout_secs,
                ProfileSettings::defaults_for(profile).timeout_secs
            );
        }
        let applied = table.get(ScanProfile::Intense).apply(&ScanConfig::default());
        assert_eq!(applied.max_concurrency, 3);

        let out_of_range = ProfileTable::new().with_limits(&ProfileLimits {
            max_concurrency: None,
            timeout_secs: Some(0),
        });
        assert!(matches!(out_of_range, Err(ScannerError::Validation(_))));
    }
}
