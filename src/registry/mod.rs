// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Registry Module
 * Tester registration table and startup discovery
 * © 2026 Bountyy Oy
 */

pub mod tester_registry;

pub use tester_registry::{TesterFactory, TesterRegistration, TesterRegistry, BUILTIN_TESTERS};
