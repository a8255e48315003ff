use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};

use crate::{Error, InternalResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Deadline applied by [`Pending::wait`](crate::proxy::Pending::wait) when the caller
    /// does not set one. `None` waits indefinitely.
    #[serde(default, with = "option_duration_ms")]
    pub request_timeout: Option<Duration>,

    /// Pending set size above which registration logs a warning.
    #[serde(default = "default_pending_warn_threshold")]
    pub pending_warn_threshold: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            request_timeout: None,
            pending_warn_threshold: default_pending_warn_threshold(),
        }
    }
}

impl ProxyConfig {
    // JSONファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        from_file(path)
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| Error::Config {
        message: format!("Failed to parse config file {}: {}", path.display(), e),
    })
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    serde_json::from_str(s).map_err(|e| Error::Config {
        message: format!("Failed to parse config: {}", e),
    })
}

fn default_pending_warn_threshold() -> usize {
    1024
}

// Option<Duration> をミリ秒でシリアライズ/デシリアライズする
mod option_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
