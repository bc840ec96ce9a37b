//! Locations module

/// Locations for the user
pub mod user {
    use camino::Utf8PathBuf;

    pub fn config_dir() -> anyhow::Result<Utf8PathBuf> {
        let dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Can't get config directory"))?;
        let dir = Utf8PathBuf::try_from(dir)?;
        Ok(dir.join("dlsync"))
    }

    pub fn cache_dir() -> anyhow::Result<Utf8PathBuf> {
        let dir = dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Can't get cache directory"))?;
        let dir = Utf8PathBuf::try_from(dir)?;
        Ok(dir.join("dlsync"))
    }
}

/// Locations for a sync instance
pub mod inst {
    use camino::Utf8PathBuf;

    pub fn config_dir(instance_name: &str) -> anyhow::Result<Utf8PathBuf> {
        Ok(super::user::config_dir()?.join(instance_name))
    }

    pub fn config_file(instance_name: &str) -> anyhow::Result<Utf8PathBuf> {
        Ok(config_dir(instance_name)?.join("config.json"))
    }

    pub fn cache_dir(instance_name: &str) -> anyhow::Result<Utf8PathBuf> {
        Ok(super::user::cache_dir()?.join(instance_name))
    }

    /// Cached remote snapshot
    pub fn remote_cache_file(instance_name: &str) -> anyhow::Result<Utf8PathBuf> {
        Ok(cache_dir(instance_name)?.join("remote-state.json"))
    }

    pub fn action_list_file(instance_name: &str) -> anyhow::Result<Utf8PathBuf> {
        Ok(cache_dir(instance_name)?.join("action-list.json"))
    }

    /// Remote snapshot taken after a sync
    pub fn remote_state_file(instance_name: &str) -> anyhow::Result<Utf8PathBuf> {
        Ok(cache_dir(instance_name)?.join("preexisting-remote-state.json"))
    }

    /// Local snapshot taken after a sync
    pub fn local_state_file(instance_name: &str) -> anyhow::Result<Utf8PathBuf> {
        Ok(cache_dir(instance_name)?.join("preexisting-local-state.json"))
    }
}
