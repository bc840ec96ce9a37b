use camino::Utf8PathBuf;
use dlsync::config::RemoteConfig;
use dlsync::loc::inst;
use dlsync::Config;
use inquire::validator::{ErrorMessage, Validation};
use inquire::{Confirm, CustomUserError, Text};

#[derive(clap::Args)]
pub struct Args {
    /// Name of the instance
    name: Option<String>,

    /// The directory to synchronize on the local file system
    #[clap(long, short = 'p')]
    local_dir: Option<Utf8PathBuf>,

    /// Name of the Data Lake Store account
    #[clap(long, short = 's')]
    store: Option<String>,

    /// Folder of the store to synchronize
    #[clap(long, short = 'r')]
    root: Option<String>,

    /// Azure AD tenant of the service principal
    #[clap(long)]
    tenant_id: String,

    /// Application id of the service principal
    #[clap(long)]
    client_id: String,

    /// Secret of the service principal
    #[clap(long)]
    client_secret: String,

    /// Glob pattern of paths to leave out (repeatable)
    #[clap(long)]
    ignore: Vec<String>,

    /// Match paths regardless of their case
    #[clap(long)]
    case_insensitive: bool,
}

pub fn main(args: Args) -> anyhow::Result<()> {
    let name = value_or_prompt(
        args.name,
        instance_name_error,
        Text::new("Name of the instance?").with_default("lake"),
    )?;

    let config_dir = inst::config_dir(&name)?;
    if config_dir.exists() {
        anyhow::bail!("Configuration already exists: {config_dir}");
    }

    let local_dir = match args.local_dir {
        Some(local_dir) => local_dir,
        None => Text::new("Local directory path?")
            .prompt()
            .map(Utf8PathBuf::from)?,
    };
    let local_dir = absolute(local_dir)?;

    let store_name = value_or_prompt(
        args.store,
        store_name_error,
        Text::new("Data Lake Store account name?"),
    )?;
    let root = value_or_prompt(
        args.root,
        store_root_error,
        Text::new("Store folder to synchronize?").with_default("/"),
    )?;

    let config = Config {
        local_dir: local_dir.clone(),
        remote: RemoteConfig {
            store_name,
            root,
            tenant_id: args.tenant_id,
            client_id: args.client_id,
            client_secret: args.client_secret,
            authority_host: None,
            endpoint: None,
        },
        ignore: args.ignore,
        case_sensitive: !args.case_insensitive,
        mtime_tolerance_secs: 0,
    };
    config
        .ignore_patterns()
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    let config_file = inst::config_file(&name)?;
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    println!("Writing configuration file: {config_file}");
    let create_res = rt.block_on(config.save_to_file(&config_file));
    match create_res {
        Ok(()) => {
            println!("Success!");
        }
        Err(err) => {
            if config_dir.exists() {
                println!("Deleting {config_dir} because of error");
                std::fs::remove_dir_all(&config_dir)?;
            }
            return Err(err);
        }
    }

    if !local_dir.exists() {
        let message = format!("Create directory {local_dir}?");
        let ans = Confirm::new(&message).with_default(true).prompt()?;
        if ans {
            std::fs::create_dir_all(local_dir.as_path())?;
        }
    }

    Ok(())
}

fn absolute(path: Utf8PathBuf) -> anyhow::Result<Utf8PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = Utf8PathBuf::try_from(std::env::current_dir()?)?;
    Ok(cwd.join(path))
}

/// Instance names become directory names under the config and cache dirs
fn instance_name_error(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some("the name is empty".into());
    }
    if name.starts_with('.') {
        return Some("the name starts with a dot".into());
    }
    let mut bad: Vec<char> = name
        .chars()
        .filter(|c| !(c.is_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .collect();
    bad.sort_unstable();
    bad.dedup();
    (!bad.is_empty()).then(|| format!("invalid characters: {bad:?}"))
}

/// Data Lake Store account names are 3 to 24 lowercase letters and digits
fn store_name_error(name: &str) -> Option<String> {
    let valid = (3..=24).contains(&name.len())
        && name.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
    (!valid).then(|| format!("'{name}' is not a store account name"))
}

fn store_root_error(root: &str) -> Option<String> {
    (!root.starts_with('/')).then(|| format!("'{root}' is not an absolute store folder"))
}

type Check = fn(&str) -> Option<String>;

fn validator(check: Check) -> impl Fn(&str) -> Result<Validation, CustomUserError> + Clone {
    move |input: &str| {
        Ok(match check(input) {
            Some(msg) => Validation::Invalid(ErrorMessage::Custom(msg)),
            None => Validation::Valid,
        })
    }
}

/// A value given on the command line, or prompted for
fn value_or_prompt(
    value: Option<String>,
    check: Check,
    prompt: Text<'_>,
) -> anyhow::Result<String> {
    match value {
        Some(value) => match check(&value) {
            Some(msg) => Err(anyhow::anyhow!("{msg}")),
            None => Ok(value),
        },
        None => Ok(prompt.with_validator(validator(check)).prompt()?),
    }
}
