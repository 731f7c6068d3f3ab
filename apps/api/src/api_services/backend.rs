use std::sync::Arc;

use tempadmin_application::PrivilegeBackend;
use tempadmin_core::AppResult;
use tempadmin_infrastructure::{CommandPrivilegeBackend, HostPlatform, InMemoryPrivilegeBackend};
use tracing::{info, warn};

use crate::api_config::{ApiConfig, BackendConfig};

pub(super) fn build_privilege_backend(config: &ApiConfig) -> AppResult<Arc<dyn PrivilegeBackend>> {
    let backend: Arc<dyn PrivilegeBackend> = match &config.backend {
        BackendConfig::Memory => {
            warn!("using in-memory privilege backend, no operating system rights are changed");
            Arc::new(InMemoryPrivilegeBackend::new())
        }
        BackendConfig::Command { admin_group } => {
            let platform = HostPlatform::current()?;
            let group = admin_group
                .clone()
                .unwrap_or_else(|| platform.default_admin_group().to_owned());
            info!(platform = ?platform, admin_group = %group, "using command privilege backend");
            Arc::new(CommandPrivilegeBackend::new(platform, group)?)
        }
    };

    Ok(backend)
}
