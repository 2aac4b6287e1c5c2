// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod acl;
mod entities;
mod logging;
mod tree;

pub use acl::{AclConfig, AclConfigLayer, GrantConfig};
pub use entities::{EntitiesConfig, EntitiesConfigLayer, EntityConfig, EntityConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use tree::{TreeConfig, TreeConfigLayer};
