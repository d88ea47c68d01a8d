//! List command for the tvm CLI.
//!
//! Prints every release version the catalog publishes for the current
//! platform, oldest first, one per line.
//!
//! ```bash
//! tvm list
//! ```

use anyhow::Result;

use crate::config::Config;
use crate::toolchain::{Version, fetch_candidates, http_client, sort_ascending};

/// Executes the list command.
///
/// # Errors
///
/// Returns an error if the catalog cannot be fetched.
pub async fn execute(config: &Config) -> Result<()> {
    for version in available_versions(config).await? {
        println!("{version}");
    }
    Ok(())
}

/// Fetches the catalog and returns its versions in ascending order.
///
/// # Errors
///
/// Returns an error if the catalog cannot be fetched.
pub async fn available_versions(config: &Config) -> Result<Vec<Version>> {
    let client = http_client()?;
    let candidates = sort_ascending(fetch_candidates(&client, config).await?);
    Ok(candidates.into_iter().map(|c| c.version).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_releases_url;
    use crate::toolchain::Platform;
    use httpmock::prelude::*;

    fn release_page(version: &str) -> String {
        format!(
            r#"<html><body><ul>
            <li><a data-os="linux" data-arch="amd64" data-version="{version}"
                   href="/terraform/{version}/terraform_{version}_linux_amd64.zip">linux</a></li>
            </ul></body></html>"#
        )
    }

    #[tokio::test]
    async fn versions_come_back_oldest_first() {
        let server = MockServer::start_async().await;
        let versions = ["1.0.0", "0.12.0", "0.13.0-beta1", "0.13.0"];

        let items: String = versions
            .iter()
            .map(|v| format!(r#"<li><a href="/terraform/{v}/">{v}</a></li>"#))
            .collect();
        let index = format!("<html><body><ul>{items}</ul></body></html>");
        server
            .mock_async(move |when, then| {
                when.method(GET).path("/terraform/");
                then.status(200).body(index);
            })
            .await;
        for version in versions {
            let page = release_page(version);
            server
                .mock_async(move |when, then| {
                    when.method(GET).path(format!("/terraform/{version}/"));
                    then.status(200).body(page);
                })
                .await;
        }

        let temp = tempfile::tempdir().unwrap();
        let config = Config::with_dirs(
            Platform::new("linux", "amd64"),
            parse_releases_url(&server.url("/terraform/")).unwrap(),
            temp.path().join("data"),
            temp.path().join("cache"),
        );

        let listed: Vec<String> = available_versions(&config)
            .await
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(listed, vec!["0.12.0", "0.13.0-beta1", "0.13.0", "1.0.0"]);
        assert!(!config.data_dir.exists(), "list must not create directories");
    }
}
