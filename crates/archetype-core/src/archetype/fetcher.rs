//! Archetype location from a remote repository or the local filesystem
//!
//! Repositories follow the Maven 2 layout:
//! `group/path/artifactId/version/artifactId-version.jar`.
//! A local source may also point straight at a jar or an exploded archetype.

use super::package::{ArchetypePackage, METADATA_DESCRIPTOR};
use crate::error::{ArchetypeError, Result};
use crate::product::ProductConfig;
use semver::Version;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

/// `groupId:artifactId[:version]` of an archetype
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchetypeCoordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
}

impl ArchetypeCoordinates {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: Option<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version,
        }
    }

    fn group_path(&self) -> impl Iterator<Item = &str> {
        self.group_id.split('.')
    }

    fn file_name(&self, version: &str) -> String {
        format!("{}-{}.jar", self.artifact_id, version)
    }
}

impl fmt::Display for ArchetypeCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}:{}:{}", self.group_id, self.artifact_id, v),
            None => write!(f, "{}:{}", self.group_id, self.artifact_id),
        }
    }
}

impl FromStr for ArchetypeCoordinates {
    type Err = ArchetypeError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let field = |i: usize| parts.get(i).copied().filter(|p| !p.is_empty());

        let mut missing = Vec::new();
        if field(0).is_none() {
            missing.push("archetypeGroupId".to_string());
        }
        if field(1).is_none() {
            missing.push("archetypeArtifactId".to_string());
        }
        if !missing.is_empty() {
            return Err(ArchetypeError::ArchetypeNotDefined(missing));
        }
        if parts.len() > 3 {
            return Err(ArchetypeError::failure(format!(
                "Invalid archetype coordinates '{}', expected groupId:artifactId[:version]",
                s
            )));
        }

        Ok(Self::new(
            field(0).unwrap_or_default(),
            field(1).unwrap_or_default(),
            field(2).map(str::to_string),
        ))
    }
}

/// Where archetypes are located
#[derive(Debug, Clone)]
pub enum ArchetypeSource {
    Remote(Url),
    Local(PathBuf),
}

impl ArchetypeSource {
    /// Create a remote source from a product config, honouring its env override
    pub fn from_config<C: ProductConfig>(config: &C) -> anyhow::Result<Self> {
        use anyhow::Context;
        let url_str = std::env::var(config.repository_url_env())
            .unwrap_or_else(|_| config.default_repository_url().to_string());
        let url =
            Url::parse(&url_str).with_context(|| format!("Invalid repository URL: {}", url_str))?;
        Ok(Self::Remote(url))
    }

    pub fn local(path: PathBuf) -> Self {
        Self::Local(path)
    }
}

/// Locates archetype packages and loads them
pub struct ArchetypeFetcher {
    source: ArchetypeSource,
    client: reqwest::Client,
}

impl ArchetypeFetcher {
    /// Create a new fetcher with a custom user agent
    pub fn new(source: ArchetypeSource, user_agent: &str) -> Self {
        Self {
            source,
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Create a fetcher from a product config
    pub fn from_config<C: ProductConfig>(config: &C) -> anyhow::Result<Self> {
        let source = ArchetypeSource::from_config(config)?;
        Ok(Self::new(source, config.user_agent()))
    }

    /// Create a fetcher for a local repository, jar or archetype directory
    pub fn from_local(path: PathBuf, user_agent: &str) -> Self {
        Self::new(ArchetypeSource::local(path), user_agent)
    }

    pub fn source(&self) -> &ArchetypeSource {
        &self.source
    }

    /// Build a URL by appending path segments, preserving query parameters
    fn build_url<'a>(base: &Url, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| ArchetypeError::failure(format!("URL cannot have path segments: {}", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Locate and load the archetype package for `coords`
    pub async fn fetch(&self, coords: &ArchetypeCoordinates) -> Result<ArchetypePackage> {
        match &self.source {
            ArchetypeSource::Remote(base_url) => self.fetch_remote(base_url, coords).await,
            ArchetypeSource::Local(path) => Self::fetch_local(path, coords),
        }
    }

    async fn fetch_remote(
        &self,
        base_url: &Url,
        coords: &ArchetypeCoordinates,
    ) -> Result<ArchetypePackage> {
        let version = coords
            .version
            .as_deref()
            .ok_or_else(|| ArchetypeError::ArchetypeNotDefined(vec!["archetypeVersion".into()]))?;
        let file_name = coords.file_name(version);
        let segments = coords
            .group_path()
            .chain([coords.artifact_id.as_str(), version, file_name.as_str()]);
        let url = Self::build_url(base_url, segments)?;

        tracing::info!(%url, "fetching archetype");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ArchetypeError::wrap(format!("Failed to fetch {}", url), e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ArchetypeError::UnknownArchetype(coords.to_string()));
        }
        if !response.status().is_success() {
            return Err(ArchetypeError::failure(format!(
                "Failed to fetch archetype {} from {}: HTTP {}",
                coords,
                url,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ArchetypeError::wrap(format!("Failed to download {}", url), e))?;
        ArchetypePackage::from_zip_bytes(&file_name, &bytes)
    }

    fn fetch_local(path: &Path, coords: &ArchetypeCoordinates) -> Result<ArchetypePackage> {
        if path.is_file() {
            return ArchetypePackage::from_zip_file(path);
        }
        if path.join(METADATA_DESCRIPTOR).is_file() || path.join("META-INF").is_dir() {
            return ArchetypePackage::from_directory(path);
        }

        let artifact_dir = coords
            .group_path()
            .fold(path.to_path_buf(), |p, segment| p.join(segment))
            .join(&coords.artifact_id);
        let version = match &coords.version {
            Some(v) => v.clone(),
            None => latest_version(&artifact_dir)
                .ok_or_else(|| ArchetypeError::UnknownArchetype(coords.to_string()))?,
        };

        let jar = artifact_dir.join(&version).join(coords.file_name(&version));
        if !jar.is_file() {
            return Err(ArchetypeError::UnknownArchetype(coords.to_string()));
        }
        tracing::info!(jar = %jar.display(), "using local archetype");
        ArchetypePackage::from_zip_file(&jar)
    }
}

/// Highest semantic version among the version directories of an artifact
fn latest_version(artifact_dir: &Path) -> Option<String> {
    std::fs::read_dir(artifact_dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter_map(|name| {
            let cleaned = name.strip_prefix('v').unwrap_or(&name);
            Version::parse(cleaned).ok().map(|v| (v, name.clone()))
        })
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_jar(repo: &Path, version: &str) {
        let dir = repo.join("org/demo/quickstart").join(version);
        std::fs::create_dir_all(&dir).unwrap();
        let pkg = ArchetypePackage::from_entries(
            "quickstart",
            vec![(
                METADATA_DESCRIPTOR,
                format!(r#"<archetype-descriptor name="qs-{}"/>"#, version).into_bytes(),
            )],
        );
        std::fs::write(
            dir.join(format!("quickstart-{}.jar", version)),
            pkg.to_zip_bytes().unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn test_parse_coordinates() {
        let c: ArchetypeCoordinates = "org.demo:quickstart:1.2.0".parse().unwrap();
        assert_eq!(c.group_id, "org.demo");
        assert_eq!(c.artifact_id, "quickstart");
        assert_eq!(c.version.as_deref(), Some("1.2.0"));
        assert_eq!(c.to_string(), "org.demo:quickstart:1.2.0");

        let c: ArchetypeCoordinates = "org.demo:quickstart".parse().unwrap();
        assert!(c.version.is_none());
    }

    #[test]
    fn test_incomplete_coordinates_not_defined() {
        match "org.demo".parse::<ArchetypeCoordinates>() {
            Err(ArchetypeError::ArchetypeNotDefined(missing)) => {
                assert_eq!(missing, vec!["archetypeArtifactId"])
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_build_url_appends_segments() {
        let base = Url::parse("https://repo.example.com/maven2/?token=abc").unwrap();
        let url = ArchetypeFetcher::build_url(&base, ["org", "demo", "a.jar"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://repo.example.com/maven2/org/demo/a.jar?token=abc"
        );
    }

    #[tokio::test]
    async fn test_local_repository_picks_latest_version() {
        let repo = tempfile::tempdir().unwrap();
        write_jar(repo.path(), "1.0.0");
        write_jar(repo.path(), "1.10.0");
        write_jar(repo.path(), "1.9.3");

        let fetcher = ArchetypeFetcher::from_local(repo.path().to_path_buf(), "test");
        let coords = ArchetypeCoordinates::new("org.demo", "quickstart", None);
        let pkg = fetcher.fetch(&coords).await.unwrap();
        match pkg.inspect().unwrap() {
            crate::archetype::ArchetypeKind::FileSet(d) => assert_eq!(d.name, "qs-1.10.0"),
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_local_artifact_is_unknown() {
        let repo = tempfile::tempdir().unwrap();
        let fetcher = ArchetypeFetcher::from_local(repo.path().to_path_buf(), "test");
        let coords = ArchetypeCoordinates::new("org.demo", "nothing", Some("1.0".into()));
        let err = fetcher.fetch(&coords).await.unwrap_err();
        assert!(matches!(err, ArchetypeError::UnknownArchetype(_)));
    }
}
