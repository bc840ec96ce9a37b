use anyhow::Context;
use dlsync::{
    loc::{inst, user},
    oauth::ClientCredentials,
    storage::{adls::DataLake, fs::FileSystem},
    Config,
};

/// If a single instance exists, get its name
pub fn single_instance_name() -> anyhow::Result<Option<String>> {
    let config_dir = user::config_dir()?;
    if !config_dir.exists() {
        return Ok(None);
    }
    let dirent = config_dir.read_dir_utf8()?.collect::<Vec<_>>();

    if dirent.len() != 1 {
        return Ok(None);
    }
    let Some(entry) = dirent.into_iter().next() else {
        return Ok(None);
    };
    let entry = entry?;
    if entry.file_type()?.is_dir() {
        Ok(Some(entry.file_name().to_owned()))
    } else {
        Ok(None)
    }
}

pub fn instance_name(name: Option<String>) -> anyhow::Result<String> {
    match name {
        Some(name) => Ok(name),
        None => single_instance_name()?.ok_or_else(|| {
            anyhow::anyhow!("Could not find a single instance, please specify the instance name")
        }),
    }
}

pub async fn load_config(instance_name: &str) -> anyhow::Result<Config> {
    let config_file = inst::config_file(instance_name)?;
    if !config_file.exists() {
        anyhow::bail!("No such config file: {config_file}");
    }
    log::info!("Found config file: {config_file}");

    let config = Config::load_from_file(&config_file).await?;
    log::trace!("Loaded config: {config:?}");
    Ok(config)
}

pub fn local_storage(config: &Config) -> anyhow::Result<FileSystem> {
    FileSystem::new(&config.local_dir)
        .with_context(|| format!("Cannot open local directory {}", config.local_dir))
}

pub fn remote_storage(config: &Config) -> anyhow::Result<DataLake<ClientCredentials>> {
    let http = reqwest::Client::new();
    let remote = &config.remote;
    let auth = ClientCredentials::new(
        remote.credentials(),
        remote.authority_host.as_deref(),
        Some(http.clone()),
    )?;
    let lake = match &remote.endpoint {
        Some(endpoint) => DataLake::with_base_url(endpoint.as_str(), &remote.root, auth, http),
        None => DataLake::new(&remote.store_name, &remote.root, auth, http),
    };
    Ok(lake)
}
