//! Azure Data Lake Store accessor, over the WebHDFS compatible REST API.
use std::sync::Arc;

use async_stream::try_stream;
use futures::Stream;
use http::{header, StatusCode};
use url::Url;

use super::Metadata;
use crate::{api_error, oauth::GetToken, path, Error, Kind, Result};

const API_VERSION: &str = "2018-09-01";
/// Maximum number of children returned by one listing request
const LIST_BATCH_SIZE: usize = 4000;

pub fn store_base_url(store_name: &str) -> String {
    format!("https://{store_name}.azuredatalakestore.net/webhdfs/v1")
}

#[derive(Debug)]
pub struct DataLake<A> {
    client: reqwest::Client,
    auth: Arc<A>,
    base_url: String,
    root: String,
    user_agent: String,
}

impl<A> Clone for DataLake<A> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            auth: self.auth.clone(),
            base_url: self.base_url.clone(),
            root: self.root.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

impl<A> DataLake<A>
where
    A: GetToken,
{
    /// Accessor for the store `store_name`, synchronizing the folder `root`.
    pub fn new(store_name: &str, root: &str, auth: A, client: reqwest::Client) -> Self {
        Self::with_base_url(store_base_url(store_name), root, auth, client)
    }

    /// Accessor for an arbitrary WebHDFS endpoint, e.g. `http://localhost:8080/webhdfs/v1`
    pub fn with_base_url(
        base_url: impl Into<String>,
        root: &str,
        auth: A,
        client: reqwest::Client,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        let root = absolute(root);
        log::info!("Initializing data lake storage {base_url} in {root}");
        Self {
            client,
            auth: Arc::new(auth),
            base_url,
            root,
            user_agent: format!("dlsync/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    fn list_url(&self, dir_path: &str, list_after: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| api_error!("invalid base url {}: {err}", self.base_url))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| api_error!("invalid base url {}", self.base_url))?;
            let mut pushed = false;
            for comp in path::components(dir_path) {
                if let path::Component::Normal(name) = comp {
                    segments.push(name);
                    pushed = true;
                }
            }
            if !pushed {
                segments.push("");
            }
        }
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("op", "LISTSTATUS")
                .append_pair("api-version", API_VERSION)
                .append_pair("listSize", &LIST_BATCH_SIZE.to_string());
            if let Some(after) = list_after {
                query.append_pair("listAfter", after);
            }
        }
        Ok(url)
    }

    async fn list_status(
        &self,
        dir_path: &str,
        list_after: Option<&str>,
    ) -> Result<Vec<api::FileStatus>> {
        let url = self.list_url(dir_path, list_after)?;
        let token = self.auth.get_token().await?;

        log::trace!("GET {url}");
        let res = self
            .client
            .get(url)
            .header(header::USER_AGENT, &self.user_agent)
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(|err| Error::unavailable(dir_path, err))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let reason = match status {
                StatusCode::NOT_FOUND => format!("no such directory ({status})"),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    format!("permission denied ({status})")
                }
                _ => format!("{status}"),
            };
            log::debug!("LISTSTATUS {dir_path} returned {status}\n{body}");
            return Err(Error::unavailable(dir_path, reason));
        }

        let list: api::ListStatus = res
            .json()
            .await
            .map_err(|err| api_error!("unexpected LISTSTATUS response for {dir_path}: {err}"))?;
        Ok(list.file_statuses.file_status)
    }
}

impl<A> super::DirEntries for DataLake<A>
where
    A: GetToken,
{
    fn root(&self) -> &str {
        &self.root
    }

    fn dir_entries(&self, parent_path: &str) -> impl Stream<Item = Result<Metadata>> + Send {
        let parent_path = parent_path.to_owned();
        try_stream! {
            log::trace!("listing entries of {parent_path}");
            let mut list_after: Option<String> = None;
            loop {
                let batch = self.list_status(&parent_path, list_after.as_deref()).await?;
                let batch_len = batch.len();
                list_after = batch.last().map(|st| st.path_suffix.clone());
                for status in batch {
                    yield map_status(&parent_path, status)?;
                }
                if batch_len < LIST_BATCH_SIZE {
                    break;
                }
            }
        }
    }
}

fn absolute(root: &str) -> String {
    let mut abs = String::from(path::SEPARATOR_STR);
    for comp in path::components(root) {
        if let path::Component::Normal(name) = comp {
            abs = path::join(&abs, name);
        }
    }
    abs
}

fn map_status(parent_path: &str, status: api::FileStatus) -> Result<Metadata> {
    let path = path::join(parent_path, &status.path_suffix);
    let mtime = crate::mtime_from_millis(status.modification_time)
        .ok_or_else(|| api_error!("invalid modificationTime for {path}"))?;
    Ok(match status.kind {
        Kind::File => Metadata::file(path, status.length, mtime),
        Kind::Directory => Metadata::directory(path, mtime),
    })
}

mod api {
    use serde::Deserialize;

    use crate::Kind;

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    pub struct ListStatus {
        pub file_statuses: FileStatuses,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    pub struct FileStatuses {
        #[serde(default)]
        pub file_status: Vec<FileStatus>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct FileStatus {
        pub path_suffix: String,
        #[serde(rename = "type")]
        pub kind: Kind,
        #[serde(default)]
        pub length: u64,
        /// Epoch milliseconds
        pub modification_time: i64,
    }
}
