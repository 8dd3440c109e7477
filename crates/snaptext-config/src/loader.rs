use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::{
    ApiKey, BASE_URL_VAR, CONFIG_FILE_NAME, Config, ConfigError, ConfigFile, DASHSCOPE_KEY_VAR,
    MODEL_VAR, OPENAI_KEY_VAR,
};

/// Resolves [`Config`] from a JSON file, falling back to the environment
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `config.json` in the directory holding the running executable
    pub fn beside_executable() -> Result<Self, ConfigError> {
        let exe = env::current_exe().map_err(ConfigError::ExecutableDir)?;
        let dir = exe.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self::new(dir.join(CONFIG_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load using the process environment
    pub fn load(&self) -> Result<Config, ConfigError> {
        self.load_with(|name| env::var(name).ok())
    }

    /// Load with a custom environment lookup.
    ///
    /// A missing or unreadable file is not an error: every setting has a
    /// default and the credential can still come from the environment.
    pub fn load_with<F>(&self, env_lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (file, source) = match self.read_file() {
            Ok(Some(file)) => (file, Some(self.path.clone())),
            Ok(None) => {
                tracing::info!("No config file at {}, using defaults", self.path.display());
                (ConfigFile::default(), None)
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {}", self.path.display(), e);
                (ConfigFile::default(), None)
            }
        };

        let credential = resolve_credential(&file, &env_lookup);

        let mut api = file.api;
        if let Some(url) = env_lookup(BASE_URL_VAR).filter(|v| !v.trim().is_empty()) {
            api.base_url = url;
        }
        if let Some(model) = env_lookup(MODEL_VAR).filter(|v| !v.trim().is_empty()) {
            api.model = model;
        }

        let config = Config {
            api,
            capture: file.capture,
            hotkeys: file.hotkeys,
            credential,
            source,
        };
        config.validate()?;

        match &config.credential {
            Some(key) => tracing::info!("API key loaded: {}", key.masked()),
            None => tracing::warn!("No API key configured, OCR requests will be skipped"),
        }

        Ok(config)
    }

    fn read_file(&self) -> Result<Option<ConfigFile>, Box<dyn std::error::Error>> {
        if !self.path.exists() {
            return Ok(None);
        }

        tracing::info!("Loading config from {}", self.path.display());
        let reader = BufReader::new(File::open(&self.path)?);
        Ok(Some(serde_json::from_reader(reader)?))
    }
}

/// File keys win over the environment; blank values count as missing
fn resolve_credential<F>(file: &ConfigFile, env_lookup: &F) -> Option<ApiKey>
where
    F: Fn(&str) -> Option<String>,
{
    let from_file = [&file.openai_api_key, &file.dashscope_api_key]
        .into_iter()
        .flatten()
        .find_map(|raw| ApiKey::parse(raw));

    if from_file.is_some() {
        tracing::debug!("API key taken from config file");
        return from_file;
    }

    let from_env = [DASHSCOPE_KEY_VAR, OPENAI_KEY_VAR]
        .into_iter()
        .filter_map(env_lookup)
        .find_map(|raw| ApiKey::parse(&raw));

    if from_env.is_some() {
        tracing::debug!("API key taken from environment");
    }
    from_env
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_file_key_beats_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"OPENAI_API_KEY": " sk-file "}"#).unwrap();

        let config = ConfigLoader::new(&path)
            .load_with(env_of(&[(OPENAI_KEY_VAR, "sk-env")]))
            .unwrap();

        assert_eq!(config.credential.unwrap().expose(), "sk-file");
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_environment_used_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new(dir.path().join("config.json"));

        let config = loader
            .load_with(env_of(&[
                (OPENAI_KEY_VAR, "sk-openai"),
                (DASHSCOPE_KEY_VAR, "sk-dash"),
            ]))
            .unwrap();

        assert_eq!(config.credential.unwrap().expose(), "sk-dash");
        assert!(config.source.is_none());
    }

    #[test]
    fn test_blank_file_key_falls_through_to_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"OPENAI_API_KEY": "   ", "ALIYUN_DASHSCOPE_API_KEY": ""}"#,
        )
        .unwrap();

        let config = ConfigLoader::new(&path)
            .load_with(env_of(&[(OPENAI_KEY_VAR, "sk-env")]))
            .unwrap();

        assert_eq!(config.credential.unwrap().expose(), "sk-env");
    }

    #[test]
    fn test_invalid_json_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let config = ConfigLoader::new(&path).load_with(env_of(&[])).unwrap();

        assert!(config.credential.is_none());
        assert_eq!(config.api.timeout_secs, 60);
    }

    #[test]
    fn test_environment_overrides_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"model": "from-file"}"#).unwrap();

        let config = ConfigLoader::new(&path)
            .load_with(env_of(&[
                (BASE_URL_VAR, "http://localhost:8080/v1"),
                (MODEL_VAR, "from-env"),
            ]))
            .unwrap();

        assert_eq!(config.api.base_url, "http://localhost:8080/v1");
        assert_eq!(config.api.model, "from-env");
    }

    #[test]
    fn test_out_of_range_value_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"jpeg_quality": 0}"#).unwrap();

        let result = ConfigLoader::new(&path).load_with(env_of(&[]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_quality_above_byte_range_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"OPENAI_API_KEY": "sk-file", "jpeg_quality": 300}"#,
        )
        .unwrap();

        let result = ConfigLoader::new(&path).load_with(env_of(&[]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                field: "jpeg_quality",
                ..
            })
        ));
    }
}
