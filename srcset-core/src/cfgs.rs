//! Single interface for registering all of the [`Config`]s a [`Workspace`] reads.
//!
//! [`Config`]: srcset_cfg::Config
//! [`Workspace`]: crate::Workspace

use srcset_cfg::{ConfigSet, ConfigSetBuilder};

pub fn all_cfgs(builder: &mut ConfigSetBuilder) {
    crate::register_configs(builder);
    srcset_resolver::register_configs(builder);
    srcset_watch::register_configs(builder);
}

/// A [`ConfigSet`] with every config registered at its default.
pub fn default_configs() -> ConfigSet {
    let mut builder = ConfigSet::builder();
    all_cfgs(&mut builder);
    builder.build()
}
