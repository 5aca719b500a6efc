use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// How [`MemoryAdapter`](super::MemoryAdapter) assigns identifiers to
/// inserted rows that do not carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStrategy {
    /// Increasing integers starting at 1.
    #[default]
    Sequential,
    /// Random v4 UUIDs as text.
    Uuid,
}

impl fmt::Display for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Uuid => write!(f, "uuid"),
        }
    }
}

impl FromStr for IdStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(Self::Sequential),
            "uuid" => Ok(Self::Uuid),
            other => Err(format!("Unknown id strategy '{}'", other)),
        }
    }
}

/// Memory adapter configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryAdapterConfig {
    /// Collection name, used in logs and snapshot file names
    pub collection: String,

    /// Name of the identifier column
    pub id_field: String,

    /// Identifier generation for inserts without an identifier
    pub id_strategy: IdStrategy,

    /// Snapshot file rewritten after every write; loaded on open
    pub snapshot_path: Option<PathBuf>,
}

impl MemoryAdapterConfig {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            id_field: "id".to_string(),
            id_strategy: IdStrategy::Sequential,
            snapshot_path: None,
        }
    }

    pub fn id_field(mut self, id_field: &str) -> Self {
        self.id_field = id_field.to_string();
        self
    }

    pub fn id_strategy(mut self, strategy: IdStrategy) -> Self {
        self.id_strategy = strategy;
        self
    }

    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Parse from a URL
    ///
    /// Format: `memory://<collection>[?ids=sequential|uuid][&id_field=<name>][&snapshot=<path>]`
    pub fn from_url(url: &str) -> Result<Self, String> {
        let Some(rest) = url.strip_prefix("memory://") else {
            return Err("URL must start with 'memory://'".to_string());
        };

        let (collection, query) = match rest.split_once('?') {
            Some((collection, query)) => (collection, Some(query)),
            None => (rest, None),
        };

        let mut config = Self::new(collection);

        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("Invalid query parameter '{}'", pair))?;
            match key {
                "ids" => config.id_strategy = value.parse()?,
                "id_field" => config.id_field = value.to_string(),
                "snapshot" => config.snapshot_path = Some(PathBuf::from(value)),
                other => return Err(format!("Unknown parameter '{}'", other)),
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn to_url(&self) -> String {
        let mut url = format!(
            "memory://{}?ids={}&id_field={}",
            self.collection, self.id_strategy, self.id_field
        );
        if let Some(path) = &self.snapshot_path {
            url.push_str(&format!("&snapshot={}", path.display()));
        }
        url
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.collection.is_empty() {
            return Err("Collection name cannot be empty".to_string());
        }

        if self.id_field.is_empty() {
            return Err("Identifier field cannot be empty".to_string());
        }

        if let Some(path) = &self.snapshot_path {
            if path.as_os_str().is_empty() || path.is_dir() {
                return Err(format!("Snapshot path '{}' must name a file", path.display()));
            }
        }

        Ok(())
    }
}

impl Default for MemoryAdapterConfig {
    fn default() -> Self {
        Self::new("default")
    }
}
