// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scanner Library
 * Concurrent scan engine: executor, event bus, testers and site mapper
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod config;
pub mod crawler;
pub mod discovery;
pub mod errors;
pub mod event_bus;
pub mod framework_detector;
pub mod http_client;
pub mod rate_limiter;
pub mod registry;
pub mod response_cache;
pub mod scanners;
pub mod types;

pub use config::{AppConfig, CacheSettings, ProfileTable, ScanProfile};
pub use crawler::{SiteMap, SiteMapper};
pub use errors::{ScannerError, ScannerResult};
pub use event_bus::{EventBus, EventKind, ScanEvent};
pub use http_client::{HttpClient, RequestResult, StatsSnapshot};
pub use registry::TesterRegistry;
pub use scanners::{ScanEngine, ScanReport, TestContext, Tester};
pub use types::{Finding, ScanConfig, Severity};
