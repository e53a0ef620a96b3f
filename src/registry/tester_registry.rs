// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Tester Registry
 * Instantiates every registered tester once at startup
 * © 2026 Bountyy Oy
 */

use anyhow::Result;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::profiles::{
    HEADER_SECURITY_TESTER, NOSQL_INJECTION_TESTER, OPEN_REDIRECT_TESTER, REFLECTED_XSS_TESTER,
    SQL_INJECTION_TESTER,
};
use crate::scanners::traits::Tester;
use crate::scanners::{header_security, nosql_injection, open_redirect, reflected_xss, sql_injection};

pub type TesterFactory = fn() -> Result<Arc<dyn Tester>>;

/// One entry of a registration table
#[derive(Clone, Copy)]
pub struct TesterRegistration {
    pub name: &'static str,
    pub factory: TesterFactory,
}

impl std::fmt::Debug for TesterRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TesterRegistration").field("name", &self.name).finish()
    }
}

/// Built-in testers. Adding a tester means adding a line here; the engine
/// never names testers itself.
pub static BUILTIN_TESTERS: &[TesterRegistration] = &[
    TesterRegistration {
        name: HEADER_SECURITY_TESTER,
        factory: header_security::create,
    },
    TesterRegistration {
        name: REFLECTED_XSS_TESTER,
        factory: reflected_xss::create,
    },
    TesterRegistration {
        name: SQL_INJECTION_TESTER,
        factory: sql_injection::create,
    },
    TesterRegistration {
        name: NOSQL_INJECTION_TESTER,
        factory: nosql_injection::create,
    },
    TesterRegistration {
        name: OPEN_REDIRECT_TESTER,
        factory: open_redirect::create,
    },
];

/// Instantiated testers, each exactly once
#[derive(Default)]
pub struct TesterRegistry {
    testers: Vec<Arc<dyn Tester>>,
    /// (registration name, reason) for factories that failed
    skipped: Vec<(String, String)>,
}

impl TesterRegistry {
    /// Registry over the built-in table
    pub fn discover() -> Self {
        Self::from_registrations(BUILTIN_TESTERS)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Run every factory. A factory that errors or panics is logged and
    /// skipped; the rest still register.
    pub fn from_registrations(registrations: &[TesterRegistration]) -> Self {
        let mut registry = Self::default();

        for registration in registrations {
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(registration.factory));

            let tester = match outcome {
                Ok(Ok(tester)) => tester,
                Ok(Err(e)) => {
                    warn!("[Registry] Failed to load tester {}: {:#}", registration.name, e);
                    registry.skipped.push((registration.name.to_string(), format!("{:#}", e)));
                    continue;
                }
                Err(_) => {
                    warn!("[Registry] Tester factory {} panicked", registration.name);
                    registry
                        .skipped
                        .push((registration.name.to_string(), "factory panicked".to_string()));
                    continue;
                }
            };

            if let Err(e) = registry.register(tester) {
                warn!("[Registry] Skipping {}: {:#}", registration.name, e);
                registry.skipped.push((registration.name.to_string(), format!("{:#}", e)));
            }
        }

        info!(
            "[Registry] Loaded {} testers ({} skipped)",
            registry.testers.len(),
            registry.skipped.len()
        );
        registry
    }

    /// Add an instantiated tester; names must be unique
    pub fn register(&mut self, tester: Arc<dyn Tester>) -> Result<()> {
        if self.get(tester.name()).is_some() {
            anyhow::bail!("duplicate tester name '{}'", tester.name());
        }
        debug!("[Registry] Registered {}", tester.name());
        self.testers.push(tester);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tester>> {
        self.testers.iter().find(|t| t.name() == name)
    }

    /// Registration order
    pub fn testers(&self) -> &[Arc<dyn Tester>] {
        &self.testers
    }

    pub fn names(&self) -> Vec<String> {
        self.testers.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn skipped(&self) -> &[(String, String)] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.testers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.testers.is_empty()
    }

    /// Testers whose names pass `filter`
    pub fn select<F>(&self, filter: F) -> Vec<Arc<dyn Tester>>
    where
        F: Fn(&str) -> bool,
    {
        let mut seen = HashSet::new();
        self.testers
            .iter()
            .filter(|t| filter(t.name()) && seen.insert(t.name().to_string()))
            .cloned()
            .collect()
    }
}
